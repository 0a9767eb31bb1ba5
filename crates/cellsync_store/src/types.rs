//! Core value types shared by the store and its callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an entity within a network: its type and key.
///
/// Ordering is by type, then key, which keeps association sets and
/// snapshots deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type, e.g. `cellular_gateway`.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Entity key, unique within the type.
    pub key: String,
}

impl EntityRef {
    /// Creates a new entity reference.
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// Creates one reference per key, all of the same type.
    pub fn many<I, K>(entity_type: &str, keys: I) -> Vec<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        keys.into_iter()
            .map(|key| Self::new(entity_type, key))
            .collect()
    }

    /// Returns true if this reference has the given type.
    #[must_use]
    pub fn is_type(&self, entity_type: &str) -> bool {
        self.entity_type == entity_type
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.key)
    }
}

/// An opaque configuration payload.
///
/// The store keeps `kind` and `data` verbatim. Producers tag every payload
/// with the kind of typed config it encodes so consumers can validate it on
/// extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPayload {
    /// Tag naming the typed config encoded in `data`.
    pub kind: String,
    /// Encoded config bytes.
    pub data: Vec<u8>,
}

impl ConfigPayload {
    /// Creates a new payload.
    pub fn new(kind: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Returns the size of the encoded config in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the encoded config is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
