//! Repository layer contracts, errors, and implementations.
//!
//! # Responsibility
//! - Define the generic CRUD data-access contract and its SQLite backend.
//! - Provide the soft-delete decorator that every caller-facing repository
//!   should be built from.
//!
//! # Invariants
//! - Id-scoped lookups return a semantic `NotFound` error; storage
//!   transport errors are propagated unchanged, never wrapped locally.
//! - Physical deletion is only reachable through the explicitly named
//!   `*_hard` operations.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod crud;
pub mod sqlite;
pub mod soft;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Storage transport failure, surfaced as-is.
    Db(DbError),
    /// Id-scoped lookup found no matching visible row. Carries the display
    /// form of the id.
    NotFound(String),
    /// Persisted document or filter input that cannot be used.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid repository data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
