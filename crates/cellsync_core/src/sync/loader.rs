//! Snapshot loading.
//!
//! A [`Snapshot`] is the current state of every entity one operation needs,
//! loaded in as few store calls as possible and then only read. Planning
//! works entirely off the snapshot; nothing is fetched lazily.

use crate::error::{CoreError, CoreResult};
use cellsync_store::{EntityFilter, EntityRef, EntityStore, LoadCriteria, LoadResult, NetworkEntity};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// What to load for each entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Load config payloads.
    pub include_config: bool,
    /// Load outgoing and incoming associations.
    pub include_associations: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::full()
    }
}

impl LoadOptions {
    /// Load everything.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            include_config: true,
            include_associations: true,
        }
    }

    /// Load associations only.
    #[must_use]
    pub const fn associations_only() -> Self {
        Self {
            include_config: false,
            include_associations: true,
        }
    }

    /// Sets whether configs are loaded.
    #[must_use]
    pub const fn include_config(mut self, value: bool) -> Self {
        self.include_config = value;
        self
    }

    /// Sets whether associations are loaded.
    #[must_use]
    pub const fn include_associations(mut self, value: bool) -> Self {
        self.include_associations = value;
        self
    }

    fn criteria(self) -> LoadCriteria {
        LoadCriteria::default()
            .with_config(self.include_config)
            .with_assocs_from_this(self.include_associations)
            .with_assocs_to_this(self.include_associations)
    }
}

/// Loaded entities for one operation, plus the refs that were asked for but
/// do not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    network_id: String,
    entities: BTreeMap<EntityRef, NetworkEntity>,
    not_found: BTreeSet<EntityRef>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn empty(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            entities: BTreeMap::new(),
            not_found: BTreeSet::new(),
        }
    }

    /// Builds a snapshot out of a store load result.
    pub fn from_load_result(network_id: impl Into<String>, result: LoadResult) -> Self {
        let entities = result
            .entities
            .into_iter()
            .map(|entity| (entity.entity_ref(), entity))
            .collect();
        Self {
            network_id: network_id.into(),
            entities,
            not_found: result.not_found,
        }
    }

    /// Network the snapshot was loaded from.
    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Looks up a loaded entity.
    pub fn get(&self, entity: &EntityRef) -> Option<&NetworkEntity> {
        self.entities.get(entity)
    }

    /// Returns true if the entity was loaded.
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.entities.contains_key(entity)
    }

    /// Looks up an entity a read needs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if it was not loaded.
    pub fn entity(&self, entity: &EntityRef) -> CoreResult<&NetworkEntity> {
        self.get(entity)
            .ok_or_else(|| CoreError::not_found(entity.clone()))
    }

    /// Looks up an entity an update depends on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ParentNotFound`] if it was not loaded.
    pub fn require_parent(&self, entity: &EntityRef) -> CoreResult<&NetworkEntity> {
        self.get(entity)
            .ok_or_else(|| CoreError::parent_not_found([entity.clone()]))
    }

    /// Checks that every given entity was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ParentNotFound`] listing every missing entity.
    pub fn require_parents<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a EntityRef>,
    ) -> CoreResult<()> {
        let missing: Vec<EntityRef> = entities
            .into_iter()
            .filter(|entity| !self.contains(entity))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::parent_not_found(missing))
        }
    }

    /// Checks that every requested ref was found.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ParentNotFound`] listing the missing refs.
    pub fn require_complete(&self) -> CoreResult<()> {
        if self.not_found.is_empty() {
            Ok(())
        } else {
            Err(CoreError::parent_not_found(self.not_found.iter().cloned()))
        }
    }

    /// Refs that were requested but do not exist.
    pub fn not_found(&self) -> &BTreeSet<EntityRef> {
        &self.not_found
    }

    /// Loaded entities of one type, in key order.
    pub fn of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a NetworkEntity> + 'a {
        self.entities
            .values()
            .filter(move |entity| entity.entity_type == entity_type)
    }

    /// All loaded entities, in ref order.
    pub fn entities(&self) -> impl Iterator<Item = &NetworkEntity> {
        self.entities.values()
    }

    /// Folds a later load into this snapshot.
    pub fn merge(&mut self, other: Snapshot) {
        self.entities.extend(other.entities);
        self.not_found.extend(other.not_found);
        let entities = &self.entities;
        self.not_found.retain(|entity| !entities.contains_key(entity));
    }

    /// Number of loaded entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Loads snapshots from a store for one network.
pub struct SnapshotLoader<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    network_id: &'a str,
    strict_children: bool,
}

impl<'a, S: EntityStore + ?Sized> SnapshotLoader<'a, S> {
    /// Creates a loader.
    pub fn new(store: &'a S, network_id: &'a str) -> Self {
        Self {
            store,
            network_id,
            strict_children: true,
        }
    }

    /// Sets whether a child that a parent points at but that cannot be
    /// loaded fails [`load_children`](Self::load_children).
    #[must_use]
    pub fn strict_children(mut self, value: bool) -> Self {
        self.strict_children = value;
        self
    }

    /// Loads the given refs in one store call.
    ///
    /// Missing refs land in [`Snapshot::not_found`]. An empty ref set
    /// returns an empty snapshot without touching the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub fn load(&self, refs: &BTreeSet<EntityRef>, options: LoadOptions) -> CoreResult<Snapshot> {
        if refs.is_empty() {
            debug!(network = self.network_id, "no refs requested, skipping load");
            return Ok(Snapshot::empty(self.network_id));
        }

        let result =
            self.store
                .load_entities(self.network_id, &EntityFilter::none(), refs, options.criteria())?;
        debug!(
            network = self.network_id,
            requested = refs.len(),
            found = result.entities.len(),
            missing = result.not_found.len(),
            "loaded snapshot"
        );
        Ok(Snapshot::from_load_result(self.network_id, result))
    }

    /// Loads every entity of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub fn load_type(&self, entity_type: &str, options: LoadOptions) -> CoreResult<Snapshot> {
        let result = self.store.load_entities(
            self.network_id,
            &EntityFilter::by_type(entity_type),
            &BTreeSet::new(),
            options.criteria(),
        )?;
        debug!(
            network = self.network_id,
            entity_type,
            found = result.entities.len(),
            "loaded entities by type"
        );
        Ok(Snapshot::from_load_result(self.network_id, result))
    }

    /// Loads the children of `child_type` that `parent` points at in
    /// `snapshot`. A parent that is not in the snapshot has no children.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for the first child that cannot be
    /// loaded when the loader is strict, or an error if the store call
    /// fails.
    pub fn load_children(
        &self,
        snapshot: &Snapshot,
        parent: &EntityRef,
        child_type: &str,
        options: LoadOptions,
    ) -> CoreResult<Snapshot> {
        let refs: BTreeSet<EntityRef> = snapshot
            .get(parent)
            .map(|entity| entity.associations_of(child_type).cloned().collect())
            .unwrap_or_default();

        let mut children = self.load(&refs, options)?;
        if let Some(missing) = children.not_found.iter().next() {
            if self.strict_children {
                return Err(CoreError::not_found(missing.clone()));
            }
            warn!(
                network = self.network_id,
                %parent,
                missing = children.not_found.len(),
                "skipping children that could not be loaded"
            );
            children.not_found.clear();
        }
        Ok(children)
    }
}
