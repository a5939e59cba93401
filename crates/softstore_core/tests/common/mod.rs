#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use softstore_core::{Audit, Principal, PrincipalSource, Record};
use uuid::Uuid;

/// Minimal domain record used across integration tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Item {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: kind.to_string(),
            audit: Audit::default(),
        }
    }
}

impl Record for Item {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

/// Principal source that always resolves to the same actor id.
pub struct FixedPrincipal(pub &'static str);

impl PrincipalSource for FixedPrincipal {
    fn current_principal(&self) -> Option<Principal> {
        Some(Principal {
            id: Some(self.0.to_string()),
        })
    }
}

/// Principal source that resolves a principal without an identifier.
pub struct AnonymousPrincipal;

impl PrincipalSource for AnonymousPrincipal {
    fn current_principal(&self) -> Option<Principal> {
        Some(Principal { id: None })
    }
}
