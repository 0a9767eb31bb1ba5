//! Network-wide configuration.

use crate::error::{CoreError, CoreResult};
use crate::kinds::ConfigKind;
use crate::projection::{
    from_backend_config, project_sub_config, rewrite_sub_config, to_backend_config, SubConfig,
    TypedConfig,
};
use cellsync_store::{Network, NetworkUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An LTE network and its network-wide configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LteNetwork {
    /// Network ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Cellular config shared by every gateway in the network.
    pub cellular: NetworkCellularConfigs,
    /// DNS config.
    pub dns: NetworkDnsConfig,
    /// Feature flags.
    pub features: Option<NetworkFeatures>,
}

/// Network-wide cellular config: RAN and EPC settings plus an optional
/// federation network.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkCellularConfigs {
    /// Radio access network settings.
    pub ran: NetworkRanConfigs,
    /// Evolved packet core settings.
    pub epc: NetworkEpcConfigs,
    /// Federation network serving this network, if any.
    pub feg_network_id: Option<FegNetworkId>,
}

/// ID of a federation gateway network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FegNetworkId(pub String);

/// Network-wide RAN settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkRanConfigs {
    /// Channel bandwidth in MHz.
    pub bandwidth_mhz: u32,
    /// TDD band settings.
    pub tdd_config: Option<NetworkRanTddConfig>,
    /// FDD band settings.
    pub fdd_config: Option<NetworkRanFddConfig>,
}

/// TDD band settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkRanTddConfig {
    /// Downlink EARFCN.
    pub earfcndl: u32,
    /// Special subframe pattern.
    pub special_subframe_pattern: u32,
    /// Subframe assignment.
    pub subframe_assignment: u32,
}

/// FDD band settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkRanFddConfig {
    /// Downlink EARFCN.
    pub earfcndl: u32,
    /// Uplink EARFCN.
    pub earfcnul: u32,
}

/// Network-wide EPC settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkEpcConfigs {
    /// Mobile country code.
    pub mcc: String,
    /// Mobile network code.
    pub mnc: String,
    /// Tracking area code.
    pub tac: u32,
    /// Authentication management field.
    pub lte_auth_amf: Vec<u8>,
    /// Operator key.
    pub lte_auth_op: Vec<u8>,
    /// Relay S6a traffic through the federation gateway.
    pub hss_relay_enabled: bool,
    /// Relay Gx/Gy traffic through the federation gateway.
    pub gx_gy_relay_enabled: bool,
    /// Policy rule applied when no other rule matches.
    pub default_rule_id: Option<String>,
    /// Services enabled on every gateway, in pipeline order.
    pub network_services: Vec<String>,
    /// Subscriber bitrate profiles by name.
    pub sub_profiles: BTreeMap<String, SubscriberProfile>,
}

/// Subscriber bitrate limits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriberProfile {
    /// Uplink limit in bits per second.
    pub max_ul_bit_rate: u64,
    /// Downlink limit in bits per second.
    pub max_dl_bit_rate: u64,
}

/// Network-wide DNS settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkDnsConfig {
    /// Cache DNS responses on gateways.
    pub enable_caching: bool,
    /// TTL for locally served records, in seconds.
    pub local_ttl: u32,
    /// Locally served records.
    pub records: Vec<DnsConfigRecord>,
}

/// A locally served DNS record set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DnsConfigRecord {
    /// Domain name.
    pub domain: String,
    /// IPv4 addresses.
    pub a_record: Vec<String>,
    /// IPv6 addresses.
    pub aaaa_record: Vec<String>,
    /// Canonical names.
    pub cname_record: Vec<String>,
}

/// Network feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkFeatures {
    /// Feature name to value.
    pub features: BTreeMap<String, String>,
}

impl TypedConfig for NetworkCellularConfigs {
    const KIND: ConfigKind = ConfigKind::CellularNetwork;
}

impl TypedConfig for NetworkDnsConfig {
    const KIND: ConfigKind = ConfigKind::DnsNetwork;
}

impl TypedConfig for NetworkFeatures {
    const KIND: ConfigKind = ConfigKind::NetworkFeatures;
}

impl SubConfig<NetworkCellularConfigs> for NetworkEpcConfigs {
    fn extract(parent: &NetworkCellularConfigs) -> Option<Self> {
        Some(parent.epc.clone())
    }

    fn replace_in(self, parent: &mut NetworkCellularConfigs) {
        parent.epc = self;
    }
}

impl SubConfig<NetworkCellularConfigs> for NetworkRanConfigs {
    fn extract(parent: &NetworkCellularConfigs) -> Option<Self> {
        Some(parent.ran.clone())
    }

    fn replace_in(self, parent: &mut NetworkCellularConfigs) {
        parent.ran = self;
    }
}

impl SubConfig<NetworkCellularConfigs> for FegNetworkId {
    fn extract(parent: &NetworkCellularConfigs) -> Option<Self> {
        parent.feg_network_id.clone()
    }

    fn replace_in(self, parent: &mut NetworkCellularConfigs) {
        parent.feg_network_id = Some(self);
    }
}

impl LteNetwork {
    /// Projects this network onto a backend network.
    ///
    /// # Errors
    ///
    /// Returns an error if a config fails to encode.
    pub fn to_backend_network(&self) -> CoreResult<Network> {
        Ok(Network {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            configs: self.config_payloads()?,
        })
    }

    /// Builds the update that makes the stored network match this one.
    ///
    /// A missing `features` config deletes the stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if a config fails to encode.
    pub fn to_update_criteria(&self) -> CoreResult<NetworkUpdate> {
        let mut update = NetworkUpdate::new(self.id.clone());
        update.new_name = Some(self.name.clone());
        update.new_description = Some(self.description.clone());
        update.configs_to_add_or_update = self.config_payloads()?;
        if self.features.is_none() {
            update
                .configs_to_delete
                .push(ConfigKind::NetworkFeatures.as_str().to_string());
        }
        Ok(update)
    }

    /// Rebuilds a network from its backend form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the cellular or DNS config is
    /// missing, or a projection error if a config does not decode.
    pub fn from_backend_network(network: &Network) -> CoreResult<Self> {
        let owner = format!("network {}", network.id);
        let cellular = network_config::<NetworkCellularConfigs>(network)?
            .ok_or_else(|| CoreError::config_not_found(&owner, ConfigKind::CellularNetwork))?;
        let dns = network_config::<NetworkDnsConfig>(network)?
            .ok_or_else(|| CoreError::config_not_found(&owner, ConfigKind::DnsNetwork))?;

        Ok(Self {
            id: network.id.clone(),
            name: network.name.clone(),
            description: network.description.clone(),
            cellular,
            dns,
            features: network_config(network)?,
        })
    }

    fn config_payloads(&self) -> CoreResult<BTreeMap<String, cellsync_store::ConfigPayload>> {
        let mut configs = BTreeMap::new();
        configs.insert(
            ConfigKind::CellularNetwork.as_str().to_string(),
            to_backend_config(&self.cellular)?,
        );
        configs.insert(
            ConfigKind::DnsNetwork.as_str().to_string(),
            to_backend_config(&self.dns)?,
        );
        if let Some(features) = &self.features {
            configs.insert(
                ConfigKind::NetworkFeatures.as_str().to_string(),
                to_backend_config(features)?,
            );
        }
        Ok(configs)
    }
}

/// Reads one typed config off a backend network.
///
/// # Errors
///
/// Returns a projection error if the stored payload does not decode.
pub fn network_config<T: TypedConfig>(network: &Network) -> CoreResult<Option<T>> {
    network
        .configs
        .get(T::KIND.as_str())
        .map(from_backend_config)
        .transpose()
}

/// Reads a cellular sub-config off a backend network.
///
/// Returns `None` if the network has no cellular config or the sub-config
/// is unset.
///
/// # Errors
///
/// Returns a projection error if the cellular payload does not decode.
pub fn network_sub_config<S>(network: &Network) -> CoreResult<Option<S>>
where
    S: SubConfig<NetworkCellularConfigs>,
{
    match network.configs.get(ConfigKind::CellularNetwork.as_str()) {
        Some(payload) => project_sub_config::<NetworkCellularConfigs, S>(payload),
        None => Ok(None),
    }
}

/// Builds the network update that replaces one cellular sub-config.
///
/// # Errors
///
/// Returns [`CoreError::ConfigNotFound`] if the network has no cellular
/// config to modify.
pub fn network_sub_config_update<S>(network: &Network, value: S) -> CoreResult<NetworkUpdate>
where
    S: SubConfig<NetworkCellularConfigs>,
{
    let kind = ConfigKind::CellularNetwork;
    let payload = network.configs.get(kind.as_str()).ok_or_else(|| {
        CoreError::config_not_found(format!("network {}", network.id), kind)
    })?;

    let mut update = NetworkUpdate::new(network.id.clone());
    update.configs_to_add_or_update.insert(
        kind.as_str().to_string(),
        rewrite_sub_config::<NetworkCellularConfigs, S>(payload, value)?,
    );
    Ok(update)
}
