//! Property-based test generators using proptest.
//!
//! Strategies produce values that pass model validation, so properties can
//! focus on delta and planning behavior.

use crate::fixtures::{TEST_APNS, TEST_ENODEBS, TEST_TIER};
use cellsync_core::models::{
    ApnResource, ApnResources, EnodebConfiguration, EnodebSerials, GatewayCellularConfigs,
    GatewayDevice, GatewayEpcConfigs, GatewayRanConfigs, MagmadGatewayConfigs, MutableLteGateway,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Strategy for entity keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,15}").expect("Invalid regex")
}

/// Strategy for small key sets drawn from a narrow alphabet, so current and
/// desired sets overlap often.
pub fn key_set_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]), 0..6)
        .prop_map(|keys| keys.into_iter().map(String::from).collect())
}

/// Strategy for a subset of the seeded eNodeB serials, in any order.
pub fn seeded_serials_strategy() -> impl Strategy<Value = EnodebSerials> {
    prop::sample::subsequence(TEST_ENODEBS.to_vec(), 0..=TEST_ENODEBS.len())
        .prop_shuffle()
        .prop_map(|serials| EnodebSerials(serials.into_iter().map(String::from).collect()))
}

/// Strategy for gateway EPC settings.
pub fn gateway_epc_strategy() -> impl Strategy<Value = GatewayEpcConfigs> {
    (
        (0u8..=255, 16u8..=30),
        any::<bool>(),
        prop::option::of(any::<[u8; 4]>()),
    )
        .prop_map(|((octet, prefix), nat_enabled, dns)| GatewayEpcConfigs {
            ip_block: format!("10.{octet}.0.0/{prefix}"),
            nat_enabled,
            dns_primary: dns.map(|d| Ipv4Addr::from(d).to_string()),
            ..GatewayEpcConfigs::default()
        })
}

/// Strategy for gateway cellular configs.
pub fn gateway_cellular_strategy() -> impl Strategy<Value = GatewayCellularConfigs> {
    (gateway_epc_strategy(), 0u32..504, any::<bool>()).prop_map(|(epc, pci, transmit_enabled)| {
        GatewayCellularConfigs {
            epc,
            ran: GatewayRanConfigs {
                pci,
                transmit_enabled,
            },
            non_eps_service: None,
        }
    })
}

/// Strategy for eNodeB radio settings.
pub fn enodeb_config_strategy() -> impl Strategy<Value = EnodebConfiguration> {
    (
        prop::sample::select(vec![5u32, 10, 15, 20]),
        any::<u32>(),
        prop::option::of(0u32..65_535),
        prop::option::of(0u32..504),
        any::<bool>(),
    )
        .prop_map(
            |(bandwidth, cell_id, earfcndl, pci, transmit_enabled)| EnodebConfiguration {
                device_class: "Baicells ID TDD/FDD".into(),
                bandwidth_mhz: Some(bandwidth),
                cell_id,
                earfcndl,
                pci,
                transmit_enabled,
                ..EnodebConfiguration::default()
            },
        )
}

/// Strategy for APN resources over the seeded APNs, with IDs `r-<apn>-<n>`.
pub fn seeded_resources_strategy() -> impl Strategy<Value = ApnResources> {
    prop::collection::btree_map(
        prop::sample::select(TEST_APNS.to_vec()),
        (0u8..3, 0u32..4096, prop::option::of(any::<[u8; 4]>())),
        0..=TEST_APNS.len(),
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(apn, (generation, vlan_id, ip))| ApnResource {
                id: format!("r-{apn}-{generation}"),
                apn_name: apn.to_string(),
                gateway_ip: ip.map(Ipv4Addr::from),
                gateway_mac: None,
                vlan_id,
            })
            .collect()
    })
}

/// Strategy for a valid gateway that references only seeded entities.
pub fn seeded_gateway_strategy(id: &'static str) -> impl Strategy<Value = MutableLteGateway> {
    (
        key_strategy(),
        gateway_cellular_strategy(),
        seeded_serials_strategy(),
        seeded_resources_strategy(),
    )
        .prop_map(move |(name, cellular, serials, apn_resources)| MutableLteGateway {
            id: id.to_string(),
            name,
            description: String::new(),
            device: GatewayDevice {
                hardware_id: format!("hw-{id}"),
            },
            magmad: MagmadGatewayConfigs::default(),
            tier: TEST_TIER.to_string(),
            cellular,
            connected_enodeb_serials: serials,
            apn_resources,
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Few cases; for properties that build a whole network per case.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
