//! Shared audit-field shape for soft-delete capable records.
//!
//! # Responsibility
//! - Define the canonical audit attributes every stored record carries.
//! - Define the `Record` contract the repository layer is generic over.
//!
//! # Invariants
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//! - `deleted == false` implies `deleted_at` and `deleted_by` are unset.

pub mod audit;
pub mod record;
