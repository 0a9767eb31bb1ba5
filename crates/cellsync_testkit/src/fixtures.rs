//! Test fixtures and seeded networks.
//!
//! Provides an in-memory configurator pre-populated with the entities most
//! gateway scenarios need, plus builders for sample models.

use cellsync_core::models::{
    Apn, ApnConfiguration, ApnResource, ApnResources, Enodeb, EnodebConfiguration, EnodebSerials,
    GatewayCellularConfigs, GatewayDevice, GatewayEpcConfigs, GatewayRanConfigs, LteNetwork,
    MagmadGatewayConfigs, MutableLteGateway, NetworkCellularConfigs, NetworkDnsConfig,
    NetworkEpcConfigs,
};
use cellsync_core::sync::WritePlan;
use cellsync_core::{Configurator, SyncConfig};
use cellsync_store::InMemoryStore;
use serde::Serialize;
use std::sync::Arc;

/// Network ID used by [`TestNetwork::seeded`].
pub const TEST_NETWORK: &str = "lte1";
/// Tier every seeded gateway joins.
pub const TEST_TIER: &str = "default";
/// Second tier, for tier moves.
pub const OTHER_TIER: &str = "canary";
/// APNs created by [`TestNetwork::seeded`].
pub const TEST_APNS: [&str; 2] = ["internet", "ims"];
/// eNodeB serials created by [`TestNetwork::seeded`].
pub const TEST_ENODEBS: [&str; 3] = ["S1", "S2", "S3"];

/// A configurator over a private in-memory store.
pub struct TestNetwork {
    /// The configurator under test.
    pub configurator: Configurator<InMemoryStore>,
}

impl TestNetwork {
    /// Creates a configurator over an empty store.
    pub fn empty(config: SyncConfig) -> Self {
        Self {
            configurator: Configurator::new(Arc::new(InMemoryStore::new()), config),
        }
    }

    /// Creates [`TEST_NETWORK`] with both tiers, [`TEST_APNS`] and
    /// [`TEST_ENODEBS`], using the default sync settings.
    pub fn seeded() -> Self {
        Self::seeded_with(SyncConfig::default())
    }

    /// Like [`TestNetwork::seeded`], with custom sync settings.
    pub fn seeded_with(config: SyncConfig) -> Self {
        let net = Self::empty(config);
        let c = &net.configurator;
        c.create_network(&sample_network(TEST_NETWORK))
            .expect("Failed to create test network");
        for tier in [TEST_TIER, OTHER_TIER] {
            c.create_tier(TEST_NETWORK, tier, tier)
                .expect("Failed to create tier");
        }
        for apn in TEST_APNS {
            c.create_apn(TEST_NETWORK, &sample_apn(apn))
                .expect("Failed to create apn");
        }
        for serial in TEST_ENODEBS {
            c.create_enodeb(TEST_NETWORK, &sample_enodeb(serial))
                .expect("Failed to create enodeb");
        }
        net
    }

    /// The backing store.
    pub fn store(&self) -> &InMemoryStore {
        self.configurator.store().as_ref()
    }

    /// Store write batches committed so far.
    pub fn write_calls(&self) -> u64 {
        self.store().write_calls()
    }
}

impl std::ops::Deref for TestNetwork {
    type Target = Configurator<InMemoryStore>;

    fn deref(&self) -> &Self::Target {
        &self.configurator
    }
}

/// Runs a test against a freshly seeded network.
///
/// # Example
///
/// ```rust
/// use cellsync_testkit::{with_seeded_network, TEST_NETWORK};
///
/// with_seeded_network(|net| {
///     assert_eq!(net.list_apns(TEST_NETWORK).unwrap().len(), 2);
/// });
/// ```
pub fn with_seeded_network<F, R>(f: F) -> R
where
    F: FnOnce(&TestNetwork) -> R,
{
    let net = TestNetwork::seeded();
    f(&net)
}

/// A network with default configs.
pub fn sample_network(id: &str) -> LteNetwork {
    LteNetwork {
        id: id.to_string(),
        name: format!("network {id}"),
        description: String::new(),
        cellular: NetworkCellularConfigs {
            epc: NetworkEpcConfigs {
                mcc: "001".into(),
                mnc: "01".into(),
                tac: 1,
                ..NetworkEpcConfigs::default()
            },
            ..NetworkCellularConfigs::default()
        },
        dns: NetworkDnsConfig::default(),
        features: None,
    }
}

/// An APN with a default QoS profile.
pub fn sample_apn(name: &str) -> Apn {
    let mut apn_configuration = ApnConfiguration::default();
    apn_configuration.qos_profile.class_id = 9;
    apn_configuration.qos_profile.priority_level = 15;
    apn_configuration.ambr.max_bandwidth_ul = 100_000_000;
    apn_configuration.ambr.max_bandwidth_dl = 200_000_000;
    Apn {
        apn_name: name.to_string(),
        apn_configuration,
    }
}

/// An eNodeB with transmit enabled.
pub fn sample_enodeb(serial: &str) -> Enodeb {
    Enodeb {
        serial: serial.to_string(),
        name: format!("enodeb {serial}"),
        description: String::new(),
        config: Some(EnodebConfiguration {
            device_class: "Baicells Nova-233 G2 OD FDD".into(),
            bandwidth_mhz: Some(20),
            cell_id: 138_777_000,
            earfcndl: Some(44_590),
            pci: Some(260),
            tac: Some(1),
            transmit_enabled: true,
            ..EnodebConfiguration::default()
        }),
        attached_gateway_id: None,
    }
}

/// An APN resource for `apn_name` with a fixed ID.
pub fn sample_resource(apn_name: &str, id: &str, vlan_id: u32) -> ApnResource {
    ApnResource {
        id: id.to_string(),
        apn_name: apn_name.to_string(),
        gateway_ip: None,
        gateway_mac: None,
        vlan_id,
    }
}

/// Builds a resource map from `(apn_name, id, vlan_id)` triples.
pub fn resources<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, u32)>) -> ApnResources {
    entries
        .into_iter()
        .map(|(apn, id, vlan)| sample_resource(apn, id, vlan))
        .collect()
}

/// A gateway on [`TEST_TIER`] with no eNodeBs and no APN resources.
pub fn sample_gateway(id: &str) -> MutableLteGateway {
    MutableLteGateway {
        id: id.to_string(),
        name: format!("gateway {id}"),
        description: String::new(),
        device: GatewayDevice {
            hardware_id: format!("hw-{id}"),
        },
        magmad: MagmadGatewayConfigs {
            checkin_interval: 60,
            checkin_timeout: 30,
            autoupgrade_enabled: true,
            autoupgrade_poll_interval: 300,
            ..MagmadGatewayConfigs::default()
        },
        tier: TEST_TIER.to_string(),
        cellular: GatewayCellularConfigs {
            epc: GatewayEpcConfigs {
                ip_block: "192.168.128.0/24".into(),
                nat_enabled: true,
                ..GatewayEpcConfigs::default()
            },
            ran: GatewayRanConfigs {
                pci: 260,
                transmit_enabled: true,
            },
            non_eps_service: None,
        },
        connected_enodeb_serials: EnodebSerials::default(),
        apn_resources: ApnResources::default(),
    }
}

/// `sample_gateway` with the given serials attached.
pub fn gateway_with_serials(id: &str, serials: &[&str]) -> MutableLteGateway {
    let mut gateway = sample_gateway(id);
    gateway.connected_enodeb_serials = serials.iter().map(|s| (*s).to_string()).collect::<Vec<_>>().into();
    gateway
}

/// One line per operation, as `"<kind> <type>:<key>"`.
pub fn plan_summary(plan: &WritePlan) -> Vec<String> {
    plan.operations().iter().map(ToString::to_string).collect()
}

/// Pretty JSON for assertion messages.
pub fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_network_has_fixtures() {
        with_seeded_network(|net| {
            assert_eq!(net.list_apns(TEST_NETWORK).unwrap().len(), TEST_APNS.len());
            assert_eq!(net.list_enodebs(TEST_NETWORK).unwrap().len(), TEST_ENODEBS.len());
            // tiers, apns, enodebs
            assert_eq!(net.store().entity_count(TEST_NETWORK), 2 + 2 + 3);
        });
    }

    #[test]
    fn sample_gateway_is_valid() {
        sample_gateway("gw1").validate().unwrap();
        let gateway = gateway_with_serials("gw1", &["S1", "S2"]);
        assert_eq!(gateway.connected_enodeb_serials.0, vec!["S1", "S2"]);
    }

    #[test]
    fn resources_are_keyed_by_apn() {
        let map = resources([("internet", "r1", 1), ("ims", "r2", 2)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.0["ims"].id, "r2");
        map.validate().unwrap();
    }
}
