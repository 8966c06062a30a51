//! Model listing types.

use serde::{Deserialize, Serialize};

/// A model the backend can serve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier, e.g. `llama3:8b`
    pub name: String,
    /// Size on disk in bytes, when reported
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification timestamp as reported by the backend
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl ModelDescriptor {
    /// Descriptor carrying only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            modified_at: None,
        }
    }
}

impl std::fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
