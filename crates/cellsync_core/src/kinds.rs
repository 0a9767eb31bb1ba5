//! Entity type names and config kinds.

use std::fmt;

/// Entity type names used in the backend graph.
pub mod entity_type {
    /// Generic gateway record (name, device, magmad config).
    pub const MAGMAD_GATEWAY: &str = "magmad_gateway";
    /// LTE-specific gateway record (cellular config, eNodeB and APN-resource edges).
    pub const CELLULAR_GATEWAY: &str = "cellular_gateway";
    /// eNodeB, keyed by hardware serial.
    pub const CELLULAR_ENODEB: &str = "cellular_enodeb";
    /// Access point name, keyed by APN name.
    pub const APN: &str = "apn";
    /// Per-gateway APN resource, keyed by a synthetic ID.
    pub const APN_RESOURCE: &str = "apn_resource";
    /// Upgrade tier, parent of magmad gateways.
    pub const UPGRADE_TIER: &str = "upgrade_tier";
}

/// Kind tag carried by every config payload.
///
/// Entity configs use the owning entity's type as their tag; network-wide
/// configs use their network config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKind {
    /// Network-wide cellular config.
    CellularNetwork,
    /// Network-wide DNS config.
    DnsNetwork,
    /// Network feature flags.
    NetworkFeatures,
    /// Magmad gateway config.
    MagmadGateway,
    /// Cellular gateway config.
    CellularGateway,
    /// eNodeB config.
    CellularEnodeb,
    /// APN config.
    Apn,
    /// APN resource.
    ApnResource,
}

impl ConfigKind {
    /// Every kind, in declaration order.
    pub const ALL: [ConfigKind; 8] = [
        ConfigKind::CellularNetwork,
        ConfigKind::DnsNetwork,
        ConfigKind::NetworkFeatures,
        ConfigKind::MagmadGateway,
        ConfigKind::CellularGateway,
        ConfigKind::CellularEnodeb,
        ConfigKind::Apn,
        ConfigKind::ApnResource,
    ];

    /// Returns the tag string stored on payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConfigKind::CellularNetwork => "cellular_network",
            ConfigKind::DnsNetwork => "dnsd_network",
            ConfigKind::NetworkFeatures => "network_features",
            ConfigKind::MagmadGateway => entity_type::MAGMAD_GATEWAY,
            ConfigKind::CellularGateway => entity_type::CELLULAR_GATEWAY,
            ConfigKind::CellularEnodeb => entity_type::CELLULAR_ENODEB,
            ConfigKind::Apn => entity_type::APN,
            ConfigKind::ApnResource => entity_type::APN_RESOURCE,
        }
    }

    /// Parses a tag string.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
