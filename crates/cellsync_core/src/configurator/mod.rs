//! Configuration service facade.

mod apn;
mod enodeb;
mod gateway;

use crate::config::SyncConfig;
use crate::error::{CoreError, CoreResult};
use crate::kinds::entity_type;
use crate::models::{
    network_config, network_sub_config, network_sub_config_update, LteNetwork,
    NetworkCellularConfigs,
};
use crate::projection::{to_backend_config, AnyConfig, SubConfig, TypedConfig};
use crate::sync::{DeltaContext, LoadOptions, Snapshot, SnapshotLoader, WritePlan};
use cellsync_store::{EntityCreate, EntityRef, EntityStore, NetworkUpdate, WriteOperation};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// The configuration service.
///
/// `Configurator` runs the read path (load, project) and the write path
/// (load, plan, submit) for networks, gateways, eNodeBs and APNs against an
/// [`EntityStore`]. Every write is one atomic batch; a failed plan never
/// reaches the store.
///
/// It holds no mutable state and may be shared across threads. Concurrent
/// writers to the same entity race at the store.
///
/// # Example
///
/// ```rust
/// use cellsync_core::{Configurator, SyncConfig};
/// use cellsync_store::InMemoryStore;
/// use std::sync::Arc;
///
/// let configurator = Configurator::new(Arc::new(InMemoryStore::new()), SyncConfig::default());
/// assert!(configurator.load_network("missing").is_err());
/// ```
pub struct Configurator<S: EntityStore> {
    store: Arc<S>,
    config: SyncConfig,
}

impl<S: EntityStore> Configurator<S> {
    /// Creates a configurator over `store`.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Sync settings.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub(crate) fn loader<'a>(&'a self, network_id: &'a str) -> SnapshotLoader<'a, S> {
        SnapshotLoader::new(self.store.as_ref(), network_id)
            .strict_children(self.config.strict_child_loads)
    }

    pub(crate) fn context<'a>(
        &'a self,
        network_id: &'a str,
        snapshot: &'a Snapshot,
    ) -> DeltaContext<'a> {
        DeltaContext::new(network_id, snapshot, &self.config)
    }

    /// Submits a plan as one atomic batch. An empty plan is not sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the batch.
    pub fn submit(&self, network_id: &str, plan: WritePlan) -> CoreResult<()> {
        if plan.is_empty() {
            debug!(network = network_id, "nothing to write");
            return Ok(());
        }
        let (creates, updates, deletes) = (plan.create_count(), plan.update_count(), plan.delete_count());
        self.store.execute_writes(network_id, plan.operations())?;
        info!(
            network = network_id,
            creates, updates, deletes, "committed write batch"
        );
        Ok(())
    }

    /// Loads a single entity by ref, failing if it does not exist.
    pub(crate) fn load_one(
        &self,
        network_id: &str,
        entity: &EntityRef,
    ) -> CoreResult<Snapshot> {
        let snapshot = self
            .loader(network_id)
            .load(&BTreeSet::from([entity.clone()]), LoadOptions::full())?;
        snapshot.entity(entity)?;
        Ok(snapshot)
    }

    /// Loads any entity's config, decoded by its kind tag. An entity
    /// without a config yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the entity does not exist, or a
    /// codec error if the tag is unknown or the payload does not decode.
    pub fn load_entity_config(
        &self,
        network_id: &str,
        entity: &EntityRef,
    ) -> CoreResult<Option<AnyConfig>> {
        let snapshot = self.load_one(network_id, entity)?;
        let stored = snapshot.entity(entity)?;
        stored.config.as_ref().map(AnyConfig::decode_tagged).transpose()
    }

    /// Creates a network.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if the network exists.
    pub fn create_network(&self, network: &LteNetwork) -> CoreResult<()> {
        self.store.create_network(network.to_backend_network()?)?;
        info!(network = %network.id, "created network");
        Ok(())
    }

    /// Loads a network.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NetworkNotFound`] if it does not exist, or
    /// [`CoreError::ConfigNotFound`] if it lacks a required config.
    pub fn load_network(&self, network_id: &str) -> CoreResult<LteNetwork> {
        LteNetwork::from_backend_network(&self.store.load_network(network_id)?)
    }

    /// Replaces a network's name, description and configs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NetworkNotFound`] if it does not exist.
    pub fn update_network(&self, network: &LteNetwork) -> CoreResult<()> {
        self.store.update_network(&network.to_update_criteria()?)?;
        info!(network = %network.id, "updated network");
        Ok(())
    }

    /// Loads one network-wide config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the network has none.
    pub fn load_network_config<T: TypedConfig>(&self, network_id: &str) -> CoreResult<T> {
        let network = self.store.load_network(network_id)?;
        network_config(&network)?
            .ok_or_else(|| CoreError::config_not_found(format!("network {network_id}"), T::KIND))
    }

    /// Replaces one network-wide config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NetworkNotFound`] if the network does not exist.
    pub fn update_network_config<T: TypedConfig>(&self, network_id: &str, value: &T) -> CoreResult<()> {
        let mut update = NetworkUpdate::new(network_id);
        update
            .configs_to_add_or_update
            .insert(T::KIND.as_str().to_string(), to_backend_config(value)?);
        self.store.update_network(&update)?;
        info!(network = network_id, kind = %T::KIND, "updated network config");
        Ok(())
    }

    /// Loads one part of the network cellular config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the network has no cellular
    /// config or the part is unset.
    pub fn load_network_sub_config<C>(&self, network_id: &str) -> CoreResult<C>
    where
        C: SubConfig<NetworkCellularConfigs>,
    {
        let network = self.store.load_network(network_id)?;
        network_sub_config(&network)?.ok_or_else(|| {
            CoreError::config_not_found(
                format!("network {network_id}"),
                <NetworkCellularConfigs as TypedConfig>::KIND,
            )
        })
    }

    /// Replaces one part of the network cellular config, rewriting the
    /// whole cellular config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the network has no cellular
    /// config.
    pub fn update_network_sub_config<C>(&self, network_id: &str, value: C) -> CoreResult<()>
    where
        C: SubConfig<NetworkCellularConfigs>,
    {
        let network = self.store.load_network(network_id)?;
        self.store
            .update_network(&network_sub_config_update(&network, value)?)?;
        info!(network = network_id, "updated network cellular config");
        Ok(())
    }

    /// Creates an upgrade tier gateways can join.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if the tier exists.
    pub fn create_tier(&self, network_id: &str, tier_id: &str, name: &str) -> CoreResult<()> {
        let create = EntityCreate::new(EntityRef::new(entity_type::UPGRADE_TIER, tier_id))
            .with_labels(name, "");
        self.store
            .execute_writes(network_id, &[WriteOperation::Create(create)])?;
        info!(network = network_id, tier = tier_id, "created tier");
        Ok(())
    }
}
