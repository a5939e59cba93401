//! Soft-delete repository decorator.
//!
//! # Responsibility
//! - Exclude logically-deleted rows from every default read/update/count
//!   path while preserving the caller's filter semantics.
//! - Convert delete calls into tombstone updates and stamp audit fields
//!   on every write path.
//! - Segregate physical deletion behind explicitly named `*_hard`
//!   operations.
//!
//! # Invariants
//! - Every operation delegates exactly once to the wrapped repository.
//! - Caller-owned filters are never mutated; rewrites produce new trees.
//! - The creation path is the single place caller-supplied deletion
//!   fields are discarded.

use crate::model::audit::{epoch_seconds, field};
use crate::model::record::{Record, RecordId};
use crate::query::{self, Document, Filter, Where};
use crate::repo::crud::CrudRepository;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use serde_json::Value;
use std::marker::PhantomData;

/// Acting principal resolved for audit stamping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    /// Stable identifier of the principal, when known.
    pub id: Option<String>,
}

/// Capability that supplies the currently-acting principal.
///
/// Injected at construction so the repository stays free of ambient
/// lookups and testable in isolation. Resolution happens per call.
pub trait PrincipalSource {
    /// Returns the current principal, or `None` when no one is acting.
    fn current_principal(&self) -> Option<Principal>;
}

/// CRUD repository decorator with soft-delete semantics and audit
/// stamping.
///
/// Reads, counts, and bulk updates see only active rows unless the
/// `*_including_deleted` variant is called. Deletes flip the tombstone
/// flag instead of removing rows; the `*_hard` operations are the only
/// physically destructive paths.
pub struct SoftCrudRepository<T: Record, R: CrudRepository<T>> {
    inner: R,
    principal: Option<Box<dyn PrincipalSource>>,
    _record: PhantomData<T>,
}

impl<T: Record, R: CrudRepository<T>> SoftCrudRepository<T, R> {
    /// Wraps a repository without a principal source; actor fields stay
    /// unset on stamped paths.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            principal: None,
            _record: PhantomData,
        }
    }

    /// Wraps a repository with a principal source for actor stamping.
    pub fn with_principal_source(inner: R, source: Box<dyn PrincipalSource>) -> Self {
        Self {
            inner,
            principal: Some(source),
            _record: PhantomData,
        }
    }

    /// Persists a new record.
    ///
    /// Caller-supplied deletion fields are discarded; creation and update
    /// stamps are applied before delegation. `created_at` survives when
    /// the caller already set it.
    pub fn create(&self, mut entity: T) -> RepoResult<T> {
        self.stamp_new(&mut entity, epoch_seconds(), self.resolve_actor());
        self.inner.create(entity)
    }

    /// Persists a batch of new records.
    ///
    /// The actor is resolved once and reused for every entity in the
    /// batch.
    pub fn create_many(&self, entities: Vec<T>) -> RepoResult<Vec<T>> {
        let actor = self.resolve_actor();
        let now = epoch_seconds();
        let stamped = entities
            .into_iter()
            .map(|mut entity| {
                self.stamp_new(&mut entity, now, actor.clone());
                entity
            })
            .collect();
        self.inner.create_many(stamped)
    }

    /// Returns active records matching the filter.
    pub fn find(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>> {
        self.inner.find(Some(&visible_filter(filter)))
    }

    /// Returns records matching the filter, soft-deleted rows included.
    pub fn find_including_deleted(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>> {
        self.inner.find(filter)
    }

    /// Returns the first active record matching the filter.
    pub fn find_one(&self, filter: Option<&Filter>) -> RepoResult<Option<T>> {
        self.inner.find_one(Some(&visible_filter(filter)))
    }

    /// Returns the first matching record, soft-deleted rows included.
    pub fn find_one_including_deleted(&self, filter: Option<&Filter>) -> RepoResult<Option<T>> {
        self.inner.find_one(filter)
    }

    /// Returns the active record with the given id.
    ///
    /// # Errors
    /// - `NotFound` when the id matches no row, or matches only a
    ///   soft-deleted row. The two cases are indistinguishable here by
    ///   design; use [`Self::find_by_id_including_deleted`] to tell them
    ///   apart.
    pub fn find_by_id(&self, id: &T::Id, filter: Option<&Filter>) -> RepoResult<T> {
        let condition =
            query::excluding_deleted_with_id(condition_of(filter), T::ID_FIELD, id.to_value());
        self.require_one(id, filter, condition)
    }

    /// Returns the record with the given id regardless of tombstone
    /// state.
    ///
    /// # Errors
    /// - `NotFound` when the id matches no row at all.
    pub fn find_by_id_including_deleted(
        &self,
        id: &T::Id,
        filter: Option<&Filter>,
    ) -> RepoResult<T> {
        let condition = query::scoped_to_id(condition_of(filter), T::ID_FIELD, id.to_value());
        self.require_one(id, filter, condition)
    }

    /// Updates every active record matching the condition.
    ///
    /// `updated_at` and `updated_by` are forced into the patch regardless
    /// of caller input; an unknown actor overwrites `updated_by` with
    /// null. Returns the number of records updated.
    pub fn update_all(&self, data: &Document, condition: Option<&Where>) -> RepoResult<u64> {
        let mut patch = data.clone();
        patch.insert(
            field::UPDATED_AT.to_string(),
            Value::from(epoch_seconds()),
        );
        patch.insert(field::UPDATED_BY.to_string(), actor_value(self.resolve_actor()));

        self.inner
            .update_all(&patch, Some(&query::excluding_deleted(condition)))
    }

    /// Counts active records matching the condition.
    pub fn count(&self, condition: Option<&Where>) -> RepoResult<u64> {
        self.inner.count(Some(&query::excluding_deleted(condition)))
    }

    /// Soft-deletes the given record.
    ///
    /// Persists `deleted`, `deleted_at`, and `deleted_by` via update and
    /// mirrors them onto the caller's instance once the store accepted
    /// the write. The row stays in the store.
    pub fn delete(&self, entity: &mut T) -> RepoResult<()> {
        let now = epoch_seconds();
        let actor = self.resolve_actor();
        self.inner
            .update_by_id(&entity.id(), &deletion_patch(now, actor.clone()))?;
        entity.audit_mut().mark_deleted(now, actor);
        Ok(())
    }

    /// Soft-deletes every active record matching the condition.
    ///
    /// Delegates to [`Self::update_all`], so the condition is rewritten
    /// there and `updated_at`/`updated_by` are refreshed alongside the
    /// tombstone fields. Returns the number of records soft-deleted.
    pub fn delete_all(&self, condition: Option<&Where>) -> RepoResult<u64> {
        let patch = deletion_patch(epoch_seconds(), self.resolve_actor());
        self.update_all(&patch, condition)
    }

    /// Soft-deletes the record with the given id.
    ///
    /// Writes the tombstone fields directly, bypassing the generic update
    /// path's stamping.
    ///
    /// # Errors
    /// - `NotFound` when no row carries the id.
    pub fn delete_by_id(&self, id: &T::Id) -> RepoResult<()> {
        self.inner
            .update_by_id(id, &deletion_patch(epoch_seconds(), self.resolve_actor()))
    }

    /// Physically deletes the given record. Irreversible; no soft-delete
    /// bookkeeping.
    pub fn delete_hard(&self, entity: &T) -> RepoResult<()> {
        self.delete_by_id_hard(&entity.id())
    }

    /// Physically deletes every record matching the condition, active or
    /// soft-deleted. Irreversible. Returns the number of records removed.
    pub fn delete_all_hard(&self, condition: Option<&Where>) -> RepoResult<u64> {
        let removed = self.inner.delete_all(condition)?;
        warn!("event=hard_delete module=repo status=ok scope=bulk removed={removed}");
        Ok(removed)
    }

    /// Physically deletes the record with the given id. Irreversible.
    ///
    /// # Errors
    /// - `NotFound` when no row carries the id.
    pub fn delete_by_id_hard(&self, id: &T::Id) -> RepoResult<()> {
        self.inner.delete_by_id(id)?;
        warn!("event=hard_delete module=repo status=ok scope=id id={id}");
        Ok(())
    }

    fn require_one(
        &self,
        id: &T::Id,
        filter: Option<&Filter>,
        condition: Where,
    ) -> RepoResult<T> {
        let scoped = Filter {
            condition: Some(condition),
            limit: filter.and_then(|f| f.limit),
            offset: filter.map_or(0, |f| f.offset),
        };
        match self.inner.find_one(Some(&scoped))? {
            Some(found) => Ok(found),
            None => Err(RepoError::NotFound(id.to_string())),
        }
    }

    fn stamp_new(&self, entity: &mut T, now: i64, actor: Option<String>) {
        let audit = entity.audit_mut();
        audit.clear_deletion();
        audit.stamp_created(now, actor);
    }

    fn resolve_actor(&self) -> Option<String> {
        self.principal
            .as_ref()
            .and_then(|source| source.current_principal())
            .and_then(|principal| principal.id)
    }
}

fn condition_of(filter: Option<&Filter>) -> Option<&Where> {
    filter.and_then(|f| f.condition.as_ref())
}

fn visible_filter(filter: Option<&Filter>) -> Filter {
    Filter {
        condition: Some(query::excluding_deleted(condition_of(filter))),
        limit: filter.and_then(|f| f.limit),
        offset: filter.map_or(0, |f| f.offset),
    }
}

fn deletion_patch(now: i64, actor: Option<String>) -> Document {
    let mut patch = Document::new();
    patch.insert(field::DELETED.to_string(), Value::Bool(true));
    patch.insert(field::DELETED_AT.to_string(), Value::from(now));
    patch.insert(field::DELETED_BY.to_string(), actor_value(actor));
    patch
}

fn actor_value(actor: Option<String>) -> Value {
    actor.map(Value::String).unwrap_or(Value::Null)
}
