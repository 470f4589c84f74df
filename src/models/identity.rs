use serde::{Deserialize, Serialize};
use std::fmt;

/// Polymorphic participant reference: a (kind, id) pair.
///
/// `kind` tags which external model the id belongs to, so users and
/// group-like entities share one address space. Two references are equal
/// only when both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityRef {
    pub kind: String,
    pub id: i64,
}

impl IdentityRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Compact `kind#id` rendering used in channel names and grant payloads.
    pub fn uid(&self) -> String {
        format!("{}#{}", self.kind, self.id)
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}
