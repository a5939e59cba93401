//! Generic CRUD repository contract.
//!
//! # Responsibility
//! - Define the storage-backed collaborator interface the soft-delete
//!   decorator wraps.
//!
//! # Invariants
//! - `create` applies storage-boundary defaults for unset timestamps.
//! - `find` returns rows in a deterministic order.
//! - `update_by_id`/`delete_by_id` report missing rows as `NotFound`.

use crate::model::record::Record;
use crate::query::{Document, Filter, Where};
use crate::repo::RepoResult;

/// Storage-backed CRUD contract over one record type.
///
/// Implementations execute conditions against the store as given; any
/// soft-delete awareness belongs to the decorating layer.
pub trait CrudRepository<T: Record> {
    /// Persists one record and returns it with storage defaults applied.
    fn create(&self, entity: T) -> RepoResult<T>;

    /// Persists a batch of records in order.
    fn create_many(&self, entities: Vec<T>) -> RepoResult<Vec<T>>;

    /// Returns all records matching the filter, in insertion order.
    fn find(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>>;

    /// Returns the first record matching the filter, if any.
    fn find_one(&self, filter: Option<&Filter>) -> RepoResult<Option<T>>;

    /// Returns the record with the given id, if present.
    fn find_by_id(&self, id: &T::Id) -> RepoResult<Option<T>>;

    /// Merges the patch into every record matching the condition.
    /// Returns the number of records updated.
    fn update_all(&self, data: &Document, condition: Option<&Where>) -> RepoResult<u64>;

    /// Merges the patch into the record with the given id.
    ///
    /// # Errors
    /// - `NotFound` when no row carries the id.
    fn update_by_id(&self, id: &T::Id, data: &Document) -> RepoResult<()>;

    /// Counts records matching the condition.
    fn count(&self, condition: Option<&Where>) -> RepoResult<u64>;

    /// Physically removes the record with the given id.
    ///
    /// # Errors
    /// - `NotFound` when no row carries the id.
    fn delete_by_id(&self, id: &T::Id) -> RepoResult<()>;

    /// Physically removes every record matching the condition.
    /// Returns the number of records removed.
    fn delete_all(&self, condition: Option<&Where>) -> RepoResult<u64>;
}
