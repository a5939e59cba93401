//! Audited soft-delete data-access layer.
//!
//! Wraps a generic CRUD repository so that every default read, update,
//! count, and delete path excludes logically-deleted rows, delete calls
//! become tombstone updates with audit stamps, and physical deletion is
//! only reachable through explicitly named hard operations.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::audit::{epoch_seconds, field, Audit};
pub use model::record::{Record, RecordId};
pub use query::{Document, Filter, Where};
pub use repo::crud::CrudRepository;
pub use repo::soft::{Principal, PrincipalSource, SoftCrudRepository};
pub use repo::sqlite::SqliteCrudRepository;
pub use repo::{RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
