//! Stored entity and network shapes, and load criteria.

use crate::types::{ConfigPayload, EntityRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A node in a network's configuration graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkEntity {
    /// Network owning this entity.
    pub network_id: String,
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Entity key.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Hardware identity for entities bound to a physical device.
    pub physical_id: Option<String>,
    /// Config payload, present only when loaded with `load_config`.
    pub config: Option<ConfigPayload>,
    /// Outgoing edges.
    pub associations: BTreeSet<EntityRef>,
    /// Incoming edges, derived by the store.
    pub parent_associations: BTreeSet<EntityRef>,
}

impl NetworkEntity {
    /// Returns this entity's reference.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.key.clone())
    }

    /// Iterates outgoing associations of one type.
    pub fn associations_of<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a EntityRef> + 'a {
        self.associations
            .iter()
            .filter(move |r| r.is_type(entity_type))
    }

    /// Iterates incoming associations of one type.
    pub fn parents_of<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a EntityRef> + 'a {
        self.parent_associations
            .iter()
            .filter(move |r| r.is_type(entity_type))
    }
}

/// A network: the root scope owning entities and network-wide configs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Network {
    /// Network ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Network-wide configs keyed by config kind.
    pub configs: BTreeMap<String, ConfigPayload>,
}

impl Network {
    /// Creates an empty network.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Changes to apply to a network's own fields and configs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkUpdate {
    /// Network ID.
    pub id: String,
    /// Replacement name.
    pub new_name: Option<String>,
    /// Replacement description.
    pub new_description: Option<String>,
    /// Configs to insert or overwrite, keyed by config kind.
    pub configs_to_add_or_update: BTreeMap<String, ConfigPayload>,
    /// Config kinds to remove.
    pub configs_to_delete: Vec<String>,
}

impl NetworkUpdate {
    /// Creates an update that changes nothing yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// What to fetch for each loaded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadCriteria {
    /// Load config payloads.
    pub load_config: bool,
    /// Load outgoing associations.
    pub load_assocs_from_this: bool,
    /// Load incoming associations.
    pub load_assocs_to_this: bool,
}

impl LoadCriteria {
    /// Loads config and both association directions.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            load_config: true,
            load_assocs_from_this: true,
            load_assocs_to_this: true,
        }
    }

    /// Loads config only.
    #[must_use]
    pub const fn config_only() -> Self {
        Self {
            load_config: true,
            load_assocs_from_this: false,
            load_assocs_to_this: false,
        }
    }

    /// Sets whether to load config payloads.
    #[must_use]
    pub const fn with_config(mut self, value: bool) -> Self {
        self.load_config = value;
        self
    }

    /// Sets whether to load outgoing associations.
    #[must_use]
    pub const fn with_assocs_from_this(mut self, value: bool) -> Self {
        self.load_assocs_from_this = value;
        self
    }

    /// Sets whether to load incoming associations.
    #[must_use]
    pub const fn with_assocs_to_this(mut self, value: bool) -> Self {
        self.load_assocs_to_this = value;
        self
    }
}

/// Filter selecting entities by type and/or key in addition to explicit refs.
///
/// An empty filter matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityFilter {
    /// Match entities of this type.
    pub type_filter: Option<String>,
    /// Match entities with this key.
    pub key_filter: Option<String>,
}

impl EntityFilter {
    /// A filter that matches nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Matches every entity of one type.
    pub fn by_type(entity_type: impl Into<String>) -> Self {
        Self {
            type_filter: Some(entity_type.into()),
            key_filter: None,
        }
    }

    /// Returns true if this filter selects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_filter.is_none() && self.key_filter.is_none()
    }

    /// Returns true if the reference passes the filter.
    #[must_use]
    pub fn matches(&self, entity: &EntityRef) -> bool {
        if self.is_empty() {
            return false;
        }
        let type_ok = self
            .type_filter
            .as_deref()
            .map_or(true, |t| entity.entity_type == t);
        let key_ok = self.key_filter.as_deref().map_or(true, |k| entity.key == k);
        type_ok && key_ok
    }
}

/// Result of a batched entity load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
    /// Entities found, ordered by reference.
    pub entities: Vec<NetworkEntity>,
    /// Requested references that do not exist.
    pub not_found: BTreeSet<EntityRef>,
}
