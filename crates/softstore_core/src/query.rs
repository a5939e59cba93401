//! Filter model and deleted-row exclusion rewrite.
//!
//! # Responsibility
//! - Define the boolean condition tree callers express filters with.
//! - Rewrite caller filters so logically-deleted rows are excluded without
//!   changing the meaning of the caller's own clauses.
//!
//! # Invariants
//! - Rewrites are copy-on-write: the caller's tree is never mutated.
//! - Appending to a conjunction preserves every existing clause.
//! - A disjunction is never extended in place; it is wrapped in a new
//!   conjunction so "any one clause matches" semantics survive.
//! - Applying a rewrite twice is equivalent to applying it once.

use crate::model::audit::field;
use serde_json::Value;

/// Flat field-equality map used in conditions and update patches.
pub type Document = serde_json::Map<String, Value>;

/// Boolean condition tree over record fields.
///
/// The closed set of variants is deliberate: there is no "unrecognized
/// shape" a rewrite could silently misinterpret.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Every sub-condition must hold.
    And(Vec<Where>),
    /// At least one sub-condition must hold.
    Or(Vec<Where>),
    /// Every listed field must equal its value.
    Fields(Document),
}

impl Where {
    /// Conjunction over the given clauses.
    pub fn all(clauses: Vec<Where>) -> Self {
        Self::And(clauses)
    }

    /// Disjunction over the given clauses.
    pub fn any(clauses: Vec<Where>) -> Self {
        Self::Or(clauses)
    }

    /// Single field-equality condition.
    pub fn field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = Document::new();
        map.insert(name.into(), value.into());
        Self::Fields(map)
    }
}

/// Query options combining an optional condition with pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Optional boolean condition tree. Absent means "match everything".
    pub condition: Option<Where>,
    /// Maximum rows to return.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl Filter {
    /// Filter with a condition and no pagination.
    pub fn with_condition(condition: Where) -> Self {
        Self {
            condition: Some(condition),
            ..Self::default()
        }
    }
}

/// Rewrites a condition so soft-deleted rows are excluded.
///
/// - Conjunction root with clauses: a `deleted = false` equality clause is
///   appended once (skipped when already present).
/// - Disjunction root with clauses: the result is a new conjunction of
///   `deleted = false` and the original disjunction unchanged.
/// - Anything else (absent condition, flat map, empty boolean node): flat
///   map semantics, with the `deleted` key set to `false`.
pub fn excluding_deleted(condition: Option<&Where>) -> Where {
    inject(condition, deleted_false())
}

/// Id-scoped variant of [`excluding_deleted`].
///
/// The injected clause requires both `deleted = false` and `id_field = id`,
/// merged by the same conjunction/disjunction rule.
pub fn excluding_deleted_with_id(condition: Option<&Where>, id_field: &str, id: Value) -> Where {
    let mut extra = deleted_false();
    extra.insert(id_field.to_string(), id);
    inject(condition, extra)
}

/// Scopes a condition to a single id without the deleted exclusion.
///
/// Used by include-deleted id lookups, which must still honor any caller
/// filter.
pub fn scoped_to_id(condition: Option<&Where>, id_field: &str, id: Value) -> Where {
    let mut extra = Document::new();
    extra.insert(id_field.to_string(), id);
    inject(condition, extra)
}

fn deleted_false() -> Document {
    let mut map = Document::new();
    map.insert(field::DELETED.to_string(), Value::Bool(false));
    map
}

fn inject(condition: Option<&Where>, extra: Document) -> Where {
    match condition {
        Some(Where::And(clauses)) if !clauses.is_empty() => {
            let extra = Where::Fields(extra);
            let mut merged = clauses.clone();
            if !merged.contains(&extra) {
                merged.push(extra);
            }
            Where::And(merged)
        }
        Some(Where::Or(clauses)) if !clauses.is_empty() => Where::And(vec![
            Where::Fields(extra),
            Where::Or(clauses.clone()),
        ]),
        Some(Where::Fields(map)) => {
            let mut merged = map.clone();
            for (key, value) in extra {
                merged.insert(key, value);
            }
            Where::Fields(merged)
        }
        // Absent condition, empty And, empty Or.
        _ => Where::Fields(extra),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        excluding_deleted, excluding_deleted_with_id, scoped_to_id, Document, Where,
    };
    use serde_json::{json, Value};

    fn deleted_clause() -> Where {
        Where::field("deleted", false)
    }

    #[test]
    fn conjunction_gets_exactly_one_appended_clause() {
        let original = Where::all(vec![Where::field("kind", "a")]);
        let rewritten = excluding_deleted(Some(&original));

        assert_eq!(
            rewritten,
            Where::all(vec![Where::field("kind", "a"), deleted_clause()])
        );
        // Caller's tree untouched.
        assert_eq!(original, Where::all(vec![Where::field("kind", "a")]));
    }

    #[test]
    fn conjunction_rewrite_is_idempotent() {
        let original = Where::all(vec![Where::field("kind", "a")]);
        let once = excluding_deleted(Some(&original));
        let twice = excluding_deleted(Some(&once));

        assert_eq!(once, twice);
    }

    #[test]
    fn disjunction_is_wrapped_not_extended() {
        let original = Where::any(vec![Where::field("kind", "a"), Where::field("kind", "b")]);
        let rewritten = excluding_deleted(Some(&original));

        assert_eq!(
            rewritten,
            Where::all(vec![deleted_clause(), original.clone()])
        );
    }

    #[test]
    fn disjunction_rewrite_is_idempotent() {
        let original = Where::any(vec![Where::field("kind", "a")]);
        let once = excluding_deleted(Some(&original));
        let twice = excluding_deleted(Some(&once));

        assert_eq!(once, twice);
    }

    #[test]
    fn flat_map_gains_deleted_key_and_keeps_others() {
        let original = Where::field("kind", "a");
        let rewritten = excluding_deleted(Some(&original));

        match rewritten {
            Where::Fields(map) => {
                assert_eq!(map.get("kind"), Some(&json!("a")));
                assert_eq!(map.get("deleted"), Some(&Value::Bool(false)));
            }
            other => panic!("expected flat map, got {other:?}"),
        }
    }

    #[test]
    fn absent_condition_becomes_deleted_false_map() {
        assert_eq!(excluding_deleted(None), deleted_clause());
    }

    #[test]
    fn empty_boolean_nodes_fall_back_to_flat_map() {
        assert_eq!(excluding_deleted(Some(&Where::And(vec![]))), deleted_clause());
        assert_eq!(excluding_deleted(Some(&Where::Or(vec![]))), deleted_clause());
    }

    #[test]
    fn id_scoped_rewrite_carries_both_equalities() {
        let rewritten = excluding_deleted_with_id(None, "id", json!("r1"));

        let mut expected = Document::new();
        expected.insert("deleted".to_string(), Value::Bool(false));
        expected.insert("id".to_string(), json!("r1"));
        assert_eq!(rewritten, Where::Fields(expected));
    }

    #[test]
    fn id_scoped_rewrite_appends_to_conjunctions() {
        let original = Where::all(vec![Where::field("kind", "a")]);
        let rewritten = excluding_deleted_with_id(Some(&original), "id", json!(7));

        match rewritten {
            Where::And(clauses) => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[0], Where::field("kind", "a"));
                match &clauses[1] {
                    Where::Fields(map) => {
                        assert_eq!(map.get("deleted"), Some(&Value::Bool(false)));
                        assert_eq!(map.get("id"), Some(&json!(7)));
                    }
                    other => panic!("expected flat map, got {other:?}"),
                }
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn id_scope_without_exclusion_merges_into_flat_maps() {
        let original = Where::field("kind", "a");
        let rewritten = scoped_to_id(Some(&original), "id", json!("r1"));

        match rewritten {
            Where::Fields(map) => {
                assert_eq!(map.get("kind"), Some(&json!("a")));
                assert_eq!(map.get("id"), Some(&json!("r1")));
                assert!(!map.contains_key("deleted"));
            }
            other => panic!("expected flat map, got {other:?}"),
        }
    }

    #[test]
    fn id_scope_wraps_disjunctions() {
        let original = Where::any(vec![Where::field("kind", "a")]);
        let rewritten = scoped_to_id(Some(&original), "id", json!("r1"));

        match rewritten {
            Where::And(clauses) => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[1], original);
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
    }
}
