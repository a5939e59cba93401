//! Record contract the repository layer is generic over.
//!
//! # Responsibility
//! - Define the shape a storable type must expose: a stable id plus the
//!   embedded audit attribute set.
//! - Keep the contract composable: concrete types embed an `Audit` value
//!   rather than inheriting from a base type.
//!
//! # Invariants
//! - `id()` must be stable for the lifetime of the record.
//! - The serialized document must carry the id under `ID_FIELD` and the
//!   audit attributes at the top level.

use crate::model::audit::Audit;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use uuid::Uuid;

/// Identifier types usable as record primary keys.
///
/// `Display` backs not-found error messages; `to_value` backs filter
/// equality clauses and storage bindings.
pub trait RecordId: Clone + PartialEq + Display {
    /// Converts the id into a filter/document value.
    fn to_value(&self) -> Value;
}

impl RecordId for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl RecordId for i64 {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl RecordId for Uuid {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

/// Contract for soft-delete capable records.
///
/// Implementors embed an `Audit` value, conventionally flattened into the
/// serialized document:
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Task {
///     id: Uuid,
///     title: String,
///     #[serde(flatten)]
///     audit: Audit,
/// }
/// ```
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Primary key type.
    type Id: RecordId;

    /// Name of the id field in the serialized document.
    const ID_FIELD: &'static str = "id";

    /// Returns the stable primary key.
    fn id(&self) -> Self::Id;

    /// Read access to the embedded audit attributes.
    fn audit(&self) -> &Audit;

    /// Write access to the embedded audit attributes.
    fn audit_mut(&mut self) -> &mut Audit;
}

#[cfg(test)]
mod tests {
    use super::RecordId;
    use serde_json::Value;
    use uuid::Uuid;

    #[test]
    fn string_and_integer_ids_convert_to_matching_values() {
        assert_eq!("abc".to_string().to_value(), Value::String("abc".into()));
        assert_eq!(7_i64.to_value(), Value::from(7));
    }

    #[test]
    fn uuid_id_converts_to_its_canonical_text_form() {
        let id = Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            id.to_value(),
            Value::String("00000000-0000-4000-8000-000000000001".into())
        );
    }
}
