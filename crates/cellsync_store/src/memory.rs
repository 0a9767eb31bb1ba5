//! In-memory entity store.

use crate::backend::EntityStore;
use crate::entity::{EntityFilter, LoadCriteria, LoadResult, Network, NetworkEntity, NetworkUpdate};
use crate::error::{StoreError, StoreResult};
use crate::operation::{EntityCreate, EntityUpdate, WriteOperation};
use crate::types::{ConfigPayload, EntityRef};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct StoredEntity {
    name: String,
    description: String,
    physical_id: Option<String>,
    config: Option<ConfigPayload>,
    associations: BTreeSet<EntityRef>,
}

#[derive(Debug, Clone)]
struct NetworkState {
    network: Network,
    entities: BTreeMap<EntityRef, StoredEntity>,
}

impl NetworkState {
    fn new(network: Network) -> Self {
        Self {
            network,
            entities: BTreeMap::new(),
        }
    }

    fn parents_of(&self, target: &EntityRef) -> BTreeSet<EntityRef> {
        self.entities
            .iter()
            .filter(|(_, stored)| stored.associations.contains(target))
            .map(|(r, _)| r.clone())
            .collect()
    }

    fn materialize(
        &self,
        entity: &EntityRef,
        stored: &StoredEntity,
        criteria: LoadCriteria,
    ) -> NetworkEntity {
        NetworkEntity {
            network_id: self.network.id.clone(),
            entity_type: entity.entity_type.clone(),
            key: entity.key.clone(),
            name: stored.name.clone(),
            description: stored.description.clone(),
            physical_id: stored.physical_id.clone(),
            config: if criteria.load_config {
                stored.config.clone()
            } else {
                None
            },
            associations: if criteria.load_assocs_from_this {
                stored.associations.clone()
            } else {
                BTreeSet::new()
            },
            parent_associations: if criteria.load_assocs_to_this {
                self.parents_of(entity)
            } else {
                BTreeSet::new()
            },
        }
    }

    fn check_targets<'a>(
        &self,
        from: &EntityRef,
        targets: impl IntoIterator<Item = &'a EntityRef>,
    ) -> StoreResult<()> {
        for target in targets {
            if !self.entities.contains_key(target) {
                return Err(StoreError::DanglingAssociation {
                    from: from.clone(),
                    to: target.clone(),
                });
            }
        }
        Ok(())
    }

    fn apply(&mut self, operation: &WriteOperation) -> StoreResult<()> {
        match operation {
            WriteOperation::Create(create) => self.apply_create(create),
            WriteOperation::Update(update) => self.apply_update(update),
            WriteOperation::Delete(entity) => self.apply_delete(entity),
        }
    }

    fn apply_create(&mut self, create: &EntityCreate) -> StoreResult<()> {
        if self.entities.contains_key(&create.entity) {
            return Err(StoreError::already_exists(format!(
                "{} in network {}",
                create.entity, self.network.id
            )));
        }
        self.check_targets(&create.entity, &create.associations)?;
        self.entities.insert(
            create.entity.clone(),
            StoredEntity {
                name: create.name.clone(),
                description: create.description.clone(),
                physical_id: create.physical_id.clone(),
                config: create.config.clone(),
                associations: create.associations.clone(),
            },
        );
        Ok(())
    }

    fn apply_update(&mut self, update: &EntityUpdate) -> StoreResult<()> {
        if !self.entities.contains_key(&update.entity) {
            return Err(StoreError::not_found(&self.network.id, update.entity.clone()));
        }
        self.check_targets(&update.entity, update.association_targets())?;

        let network_id = self.network.id.clone();
        let stored = self
            .entities
            .get_mut(&update.entity)
            .ok_or_else(|| StoreError::not_found(network_id, update.entity.clone()))?;

        if let Some(name) = &update.new_name {
            stored.name.clone_from(name);
        }
        if let Some(description) = &update.new_description {
            stored.description.clone_from(description);
        }
        if let Some(config) = &update.new_config {
            stored.config = Some(config.clone());
        }
        if let Some(set) = &update.associations_to_set {
            stored.associations.clone_from(set);
        }
        stored
            .associations
            .extend(update.associations_to_add.iter().cloned());
        for removed in &update.associations_to_delete {
            stored.associations.remove(removed);
        }
        Ok(())
    }

    fn apply_delete(&mut self, entity: &EntityRef) -> StoreResult<()> {
        if self.entities.remove(entity).is_none() {
            return Err(StoreError::not_found(&self.network.id, entity.clone()));
        }
        for stored in self.entities.values_mut() {
            stored.associations.remove(entity);
        }
        Ok(())
    }
}

/// An in-memory entity store.
///
/// This store keeps every network in memory and is suitable for:
/// - Unit and integration tests
/// - The CLI's fixture-backed commands
///
/// Write batches are staged on a copy of the network and swapped in only if
/// every operation applies, which gives the all-or-nothing guarantee the
/// [`EntityStore`] contract requires.
///
/// # Thread Safety
///
/// This store is thread-safe; a single write lock serializes batches.
///
/// # Example
///
/// ```rust
/// use cellsync_store::{EntityStore, InMemoryStore, Network};
///
/// let store = InMemoryStore::new();
/// store.create_network(Network::new("net1")).unwrap();
/// assert_eq!(store.entity_count("net1"), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    networks: RwLock<BTreeMap<String, NetworkState>>,
    load_calls: AtomicU64,
    write_calls: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entities in a network (zero if it is missing).
    #[must_use]
    pub fn entity_count(&self, network_id: &str) -> usize {
        self.networks
            .read()
            .get(network_id)
            .map_or(0, |state| state.entities.len())
    }

    /// Returns true if the entity exists.
    #[must_use]
    pub fn contains(&self, network_id: &str, entity: &EntityRef) -> bool {
        self.networks
            .read()
            .get(network_id)
            .is_some_and(|state| state.entities.contains_key(entity))
    }

    /// Number of `load_entities` calls served or rejected so far.
    #[must_use]
    pub fn load_calls(&self) -> u64 {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Number of `execute_writes` calls served or rejected so far.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    ///
    /// Useful for testing error propagation.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("store marked unavailable"))
        } else {
            Ok(())
        }
    }
}

impl EntityStore for InMemoryStore {
    fn load_entities(
        &self,
        network_id: &str,
        filter: &EntityFilter,
        refs: &BTreeSet<EntityRef>,
        criteria: LoadCriteria,
    ) -> StoreResult<LoadResult> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let networks = self.networks.read();
        let state = networks
            .get(network_id)
            .ok_or_else(|| StoreError::network_not_found(network_id))?;

        let mut wanted: BTreeSet<&EntityRef> = refs.iter().collect();
        wanted.extend(state.entities.keys().filter(|r| filter.matches(r)));

        let mut result = LoadResult::default();
        for entity in wanted {
            match state.entities.get(entity) {
                Some(stored) => result
                    .entities
                    .push(state.materialize(entity, stored, criteria)),
                None => {
                    result.not_found.insert(entity.clone());
                }
            }
        }

        debug!(
            network_id,
            requested = refs.len(),
            loaded = result.entities.len(),
            not_found = result.not_found.len(),
            "loaded entities"
        );
        Ok(result)
    }

    fn execute_writes(&self, network_id: &str, operations: &[WriteOperation]) -> StoreResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut networks = self.networks.write();
        let state = networks
            .get_mut(network_id)
            .ok_or_else(|| StoreError::network_not_found(network_id))?;

        let mut staged = state.clone();
        for operation in operations {
            staged.apply(operation)?;
        }
        *state = staged;

        debug!(network_id, writes = operations.len(), "applied write batch");
        Ok(())
    }

    fn create_network(&self, network: Network) -> StoreResult<()> {
        self.check_available()?;
        let mut networks = self.networks.write();
        if networks.contains_key(&network.id) {
            return Err(StoreError::already_exists(format!("network {}", network.id)));
        }
        networks.insert(network.id.clone(), NetworkState::new(network));
        Ok(())
    }

    fn load_network(&self, network_id: &str) -> StoreResult<Network> {
        self.check_available()?;
        self.networks
            .read()
            .get(network_id)
            .map(|state| state.network.clone())
            .ok_or_else(|| StoreError::network_not_found(network_id))
    }

    fn update_network(&self, update: &NetworkUpdate) -> StoreResult<()> {
        self.check_available()?;
        let mut networks = self.networks.write();
        let state = networks
            .get_mut(&update.id)
            .ok_or_else(|| StoreError::network_not_found(&update.id))?;

        let network = &mut state.network;
        if let Some(name) = &update.new_name {
            network.name.clone_from(name);
        }
        if let Some(description) = &update.new_description {
            network.description.clone_from(description);
        }
        for (kind, payload) in &update.configs_to_add_or_update {
            network.configs.insert(kind.clone(), payload.clone());
        }
        for kind in &update.configs_to_delete {
            network.configs.remove(kind);
        }
        Ok(())
    }
}
