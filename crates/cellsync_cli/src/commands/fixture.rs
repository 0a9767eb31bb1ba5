//! JSON fixtures seeding the in-memory store.

use super::{CommandError, CommandResult};
use cellsync_core::models::{Apn, Enodeb, LteNetwork, MutableLteGateway};
use cellsync_core::{Configurator, SyncConfig};
use cellsync_store::InMemoryStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything needed to stand up one network.
///
/// Entities are created in field order, so gateways may reference any tier,
/// APN or eNodeB listed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// The network.
    pub network: LteNetwork,
    /// Upgrade tier IDs.
    #[serde(default)]
    pub tiers: Vec<String>,
    /// APNs.
    #[serde(default)]
    pub apns: Vec<Apn>,
    /// eNodeBs.
    #[serde(default)]
    pub enodebs: Vec<Enodeb>,
    /// Gateways.
    #[serde(default)]
    pub gateways: Vec<MutableLteGateway>,
}

impl Fixture {
    /// Reads a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a fixture.
    pub fn load(path: &Path) -> CommandResult<Self> {
        read_json(path)
    }

    /// Creates a configurator over a fresh store holding this fixture.
    ///
    /// # Errors
    ///
    /// Returns the first error the configurator reports while seeding.
    pub fn seed(&self, config: SyncConfig) -> CommandResult<Configurator<InMemoryStore>> {
        let configurator = Configurator::new(Arc::new(InMemoryStore::new()), config);
        let network_id = self.network.id.as_str();

        configurator.create_network(&self.network)?;
        for tier in &self.tiers {
            configurator.create_tier(network_id, tier, tier)?;
        }
        for apn in &self.apns {
            configurator.create_apn(network_id, apn)?;
        }
        for enodeb in &self.enodebs {
            configurator.create_enodeb(network_id, enodeb)?;
        }
        for gateway in &self.gateways {
            configurator.create_gateway(network_id, gateway)?;
        }

        debug!(
            network = network_id,
            entities = configurator.store().entity_count(network_id),
            "seeded store from fixture"
        );
        Ok(configurator)
    }
}

/// Parses a JSON file into `T`.
///
/// # Errors
///
/// Returns [`CommandError::Io`] or [`CommandError::Json`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CommandResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CommandError::Json {
        path: path.display().to_string(),
        source,
    })
}
