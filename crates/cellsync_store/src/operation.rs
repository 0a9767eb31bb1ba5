//! Write operations accepted by [`crate::EntityStore::execute_writes`].

use crate::entity::NetworkEntity;
use crate::types::{ConfigPayload, EntityRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Creation of a new entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCreate {
    /// Identity of the new entity.
    pub entity: EntityRef,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Hardware identity, if any.
    pub physical_id: Option<String>,
    /// Initial config.
    pub config: Option<ConfigPayload>,
    /// Initial outgoing associations.
    pub associations: BTreeSet<EntityRef>,
}

impl EntityCreate {
    /// Creates a bare entity with no config or associations.
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            name: String::new(),
            description: String::new(),
            physical_id: None,
            config: None,
            associations: BTreeSet::new(),
        }
    }

    /// Sets the name and description.
    #[must_use]
    pub fn with_labels(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    /// Sets the config payload.
    #[must_use]
    pub fn with_config(mut self, config: ConfigPayload) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the hardware identity.
    #[must_use]
    pub fn with_physical_id(mut self, physical_id: impl Into<String>) -> Self {
        self.physical_id = Some(physical_id.into());
        self
    }

    /// Adds outgoing associations.
    #[must_use]
    pub fn with_associations(mut self, targets: impl IntoIterator<Item = EntityRef>) -> Self {
        self.associations.extend(targets);
        self
    }
}

/// In-place modification of an existing entity.
///
/// Association changes apply in a fixed order: `associations_to_set`
/// replaces every outgoing edge, then `associations_to_add` is inserted,
/// then `associations_to_delete` is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUpdate {
    /// Entity to modify.
    pub entity: EntityRef,
    /// Replacement name.
    pub new_name: Option<String>,
    /// Replacement description.
    pub new_description: Option<String>,
    /// Replacement config.
    pub new_config: Option<ConfigPayload>,
    /// Edges to insert.
    pub associations_to_add: BTreeSet<EntityRef>,
    /// Full replacement of outgoing edges.
    pub associations_to_set: Option<BTreeSet<EntityRef>>,
    /// Edges to remove.
    pub associations_to_delete: BTreeSet<EntityRef>,
}

impl EntityUpdate {
    /// Creates an update that changes nothing yet.
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            new_name: None,
            new_description: None,
            new_config: None,
            associations_to_add: BTreeSet::new(),
            associations_to_set: None,
            associations_to_delete: BTreeSet::new(),
        }
    }

    /// Sets the replacement config.
    #[must_use]
    pub fn with_config(mut self, config: ConfigPayload) -> Self {
        self.new_config = Some(config);
        self
    }

    /// Sets the full replacement of outgoing edges.
    #[must_use]
    pub fn with_associations_set(mut self, targets: impl IntoIterator<Item = EntityRef>) -> Self {
        self.associations_to_set = Some(targets.into_iter().collect());
        self
    }

    /// Adds edges to insert.
    #[must_use]
    pub fn with_associations_added(mut self, targets: impl IntoIterator<Item = EntityRef>) -> Self {
        self.associations_to_add.extend(targets);
        self
    }

    /// Adds edges to remove.
    #[must_use]
    pub fn with_associations_deleted(
        mut self,
        targets: impl IntoIterator<Item = EntityRef>,
    ) -> Self {
        self.associations_to_delete.extend(targets);
        self
    }

    /// Returns true if applying this update would change nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.new_name.is_none()
            && self.new_description.is_none()
            && self.new_config.is_none()
            && self.associations_to_add.is_empty()
            && self.associations_to_set.is_none()
            && self.associations_to_delete.is_empty()
    }

    /// Drops every change `stored` already reflects. The result applied to
    /// `stored` gives the same entity as `self` would.
    #[must_use]
    pub fn without_unchanged(mut self, stored: &NetworkEntity) -> Self {
        if self.new_name.as_ref() == Some(&stored.name) {
            self.new_name = None;
        }
        if self.new_description.as_ref() == Some(&stored.description) {
            self.new_description = None;
        }
        if self.new_config.is_some() && self.new_config == stored.config {
            self.new_config = None;
        }
        if self.associations_to_set.as_ref() == Some(&stored.associations) {
            self.associations_to_set = None;
        }
        if self.associations_to_set.is_none() {
            self.associations_to_add
                .retain(|target| !stored.associations.contains(target));
            self.associations_to_delete
                .retain(|target| stored.associations.contains(target));
        }
        self
    }

    /// Returns true if this update touches outgoing edges.
    #[must_use]
    pub fn touches_associations(&self) -> bool {
        !self.associations_to_add.is_empty()
            || self.associations_to_set.is_some()
            || !self.associations_to_delete.is_empty()
    }

    /// Every entity this update points an edge at.
    pub fn association_targets(&self) -> impl Iterator<Item = &EntityRef> {
        self.associations_to_add
            .iter()
            .chain(self.associations_to_set.iter().flatten())
    }
}

/// One entry of an ordered write batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOperation {
    /// Create a new entity.
    Create(EntityCreate),
    /// Modify an existing entity.
    Update(EntityUpdate),
    /// Delete an entity together with every edge touching it.
    Delete(EntityRef),
}

impl WriteOperation {
    /// Returns the entity this operation writes.
    #[must_use]
    pub fn target(&self) -> &EntityRef {
        match self {
            WriteOperation::Create(create) => &create.entity,
            WriteOperation::Update(update) => &update.entity,
            WriteOperation::Delete(entity) => entity,
        }
    }

    /// Returns a short name for the operation kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            WriteOperation::Create(_) => "create",
            WriteOperation::Update(_) => "update",
            WriteOperation::Delete(_) => "delete",
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_without_unchanged_keeps_only_differences() {
        let apn = EntityRef::new("apn", "internet");
        let mut stored = NetworkEntity {
            entity_type: "apn_resource".into(),
            key: "r1".into(),
            name: "r1".into(),
            config: Some(ConfigPayload::new("apn_resource", vec![1])),
            ..NetworkEntity::default()
        };
        stored.associations.insert(apn.clone());

        let mut same = EntityUpdate::new(stored.entity_ref())
            .with_config(ConfigPayload::new("apn_resource", vec![1]))
            .with_associations_set([apn.clone()])
            .with_associations_added([apn.clone()]);
        same.new_name = Some("r1".into());
        assert!(same.without_unchanged(&stored).is_noop());

        let changed = EntityUpdate::new(stored.entity_ref())
            .with_config(ConfigPayload::new("apn_resource", vec![2]))
            .with_associations_set([apn.clone()])
            .without_unchanged(&stored);
        assert_eq!(changed.new_config, Some(ConfigPayload::new("apn_resource", vec![2])));
        assert!(changed.associations_to_set.is_none());

        stored.associations.clear();
        let relinked = EntityUpdate::new(stored.entity_ref())
            .with_associations_set([apn.clone()])
            .without_unchanged(&stored);
        assert_eq!(relinked.associations_to_set, Some(BTreeSet::from([apn])));
    }

    #[test]
    fn update_noop_detection() {
        let target = EntityRef::new("cellular_gateway", "gw1");
        assert!(EntityUpdate::new(target.clone()).is_noop());

        let update = EntityUpdate::new(target.clone()).with_associations_set(Vec::new());
        assert!(!update.is_noop());
        assert!(update.touches_associations());

        let update = EntityUpdate::new(target).with_config(ConfigPayload::new("x", vec![0]));
        assert!(!update.touches_associations());
    }

    #[test]
    fn association_targets_cover_add_and_set() {
        let update = EntityUpdate::new(EntityRef::new("cellular_gateway", "gw1"))
            .with_associations_added([EntityRef::new("apn_resource", "r1")])
            .with_associations_set([EntityRef::new("cellular_enodeb", "S1")])
            .with_associations_deleted([EntityRef::new("cellular_enodeb", "S9")]);

        let targets: Vec<_> = update.association_targets().collect();
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn operation_display() {
        let op = WriteOperation::Delete(EntityRef::new("apn_resource", "r1"));
        assert_eq!(op.to_string(), "delete apn_resource:r1");
        assert_eq!(op.kind(), "delete");
    }
}
