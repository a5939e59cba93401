//! Audit attribute set shared by every soft-delete capable record.
//!
//! # Responsibility
//! - Declare creation/update/deletion timestamps and actor identity.
//! - Provide the lifecycle mutators that keep tombstone fields consistent.
//!
//! # Invariants
//! - `deleted == false` implies `deleted_at` and `deleted_by` are unset.
//! - The flag and its companion fields are only changed together.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Canonical field names for audit attributes as they appear in stored
/// documents and filter conditions.
pub mod field {
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const CREATED_BY: &str = "created_by";
    pub const UPDATED_BY: &str = "updated_by";
    pub const DELETED: &str = "deleted";
    pub const DELETED_AT: &str = "deleted_at";
    pub const DELETED_BY: &str = "deleted_by";
}

/// Audit metadata embedded in every record.
///
/// Concrete record types embed one `Audit` value (conventionally with
/// `#[serde(flatten)]`) so the attributes live at the top level of the
/// stored document. All fields are optional or defaulted, which supports
/// partial construction in tests and partial hydration from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audit {
    /// Epoch seconds of first persistence. Set once, never overwritten.
    pub created_at: Option<i64>,
    /// Epoch seconds of the last successful create or update.
    pub updated_at: Option<i64>,
    /// Identifier of the principal that created the record.
    pub created_by: Option<String>,
    /// Identifier of the principal that last updated the record.
    pub updated_by: Option<String>,
    /// Soft-delete tombstone flag. The source of truth for visibility.
    pub deleted: bool,
    /// Epoch seconds of the soft delete. Set only with `deleted = true`.
    pub deleted_at: Option<i64>,
    /// Identifier of the principal that soft-deleted the record.
    pub deleted_by: Option<String>,
}

impl Audit {
    /// Returns whether this record should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Marks the record as softly deleted.
    ///
    /// Sets the flag and both companion fields in one call so the
    /// tombstone invariant cannot be half-applied.
    pub fn mark_deleted(&mut self, at: i64, by: Option<String>) {
        self.deleted = true;
        self.deleted_at = Some(at);
        self.deleted_by = by;
    }

    /// Clears the tombstone flag and both companion fields.
    ///
    /// Used by the creation path to discard caller-supplied deletion
    /// state before persistence.
    pub fn clear_deletion(&mut self) {
        self.deleted = false;
        self.deleted_at = None;
        self.deleted_by = None;
    }

    /// Stamps creation metadata.
    ///
    /// # Contract
    /// - `created_at` is only filled when unset.
    /// - `updated_at` is always refreshed to `at`.
    /// - Both actor fields are overwritten with `by`.
    pub fn stamp_created(&mut self, at: i64, by: Option<String>) {
        self.created_at.get_or_insert(at);
        self.updated_at = Some(at);
        self.created_by = by.clone();
        self.updated_by = by;
    }
}

/// Current wall-clock time in epoch seconds.
pub fn epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
