//! Store trait definition.

use crate::entity::{EntityFilter, LoadCriteria, LoadResult, Network, NetworkEntity, NetworkUpdate};
use crate::error::{StoreError, StoreResult};
use crate::operation::WriteOperation;
use crate::types::EntityRef;
use std::collections::BTreeSet;

/// A network-scoped entity graph store.
///
/// The synchronization core talks to the backend only through this trait.
///
/// # Invariants
///
/// - Entities never cross network boundaries
/// - `execute_writes` applies the whole batch or nothing
/// - Operations in a batch apply in order; each one observes the ones before it
/// - An association target must exist when the operation naming it applies
/// - Deleting an entity removes every edge touching it
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - Reference engine
pub trait EntityStore: Send + Sync {
    /// Loads entities named by `refs` plus any matched by `filter`.
    ///
    /// Missing refs are reported in [`LoadResult::not_found`], never as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the network does not exist or the store cannot
    /// serve the request.
    fn load_entities(
        &self,
        network_id: &str,
        filter: &EntityFilter,
        refs: &BTreeSet<EntityRef>,
        criteria: LoadCriteria,
    ) -> StoreResult<LoadResult>;

    /// Loads a single entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the entity does not exist.
    fn load_entity(
        &self,
        network_id: &str,
        entity: &EntityRef,
        criteria: LoadCriteria,
    ) -> StoreResult<NetworkEntity> {
        let refs = BTreeSet::from([entity.clone()]);
        let loaded = self.load_entities(network_id, &EntityFilter::none(), &refs, criteria)?;
        loaded
            .entities
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(network_id, entity.clone()))
    }

    /// Applies an ordered batch of writes atomically.
    ///
    /// # Errors
    ///
    /// Returns an error, with nothing applied, if any operation in the batch
    /// fails.
    fn execute_writes(&self, network_id: &str, operations: &[WriteOperation]) -> StoreResult<()>;

    /// Creates a network.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the ID is taken.
    fn create_network(&self, network: Network) -> StoreResult<()>;

    /// Loads a network with its configs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NetworkNotFound`] if the network does not exist.
    fn load_network(&self, network_id: &str) -> StoreResult<Network>;

    /// Applies changes to a network's own fields and configs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NetworkNotFound`] if the network does not exist.
    fn update_network(&self, update: &NetworkUpdate) -> StoreResult<()>;
}
