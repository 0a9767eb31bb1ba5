//! Typed configuration models.
//!
//! These are the shapes REST and CLI layers exchange with the core. Each
//! model knows how to project itself onto backend entities and how to be
//! rebuilt from them; none of them perform I/O.

mod apn;
mod enodeb;
mod gateway;
mod network;

pub use apn::{
    AggregatedMaximumBitrate, Apn, ApnConfiguration, ApnList, ApnResource, ApnResources,
    QosProfile,
};
pub use enodeb::{Enodeb, EnodebConfiguration};
pub use gateway::{
    EnodebSerials, GatewayCellularConfigs, GatewayDevice, GatewayEpcConfigs, GatewayNonEpsConfigs,
    GatewayRanConfigs, LteGateway, MagmadGateway, MagmadGatewayConfigs, MutableLteGateway,
};
pub use network::{
    network_config, network_sub_config, network_sub_config_update, DnsConfigRecord, FegNetworkId,
    LteNetwork, NetworkCellularConfigs, NetworkDnsConfig, NetworkEpcConfigs, NetworkFeatures,
    NetworkRanConfigs, NetworkRanFddConfig, NetworkRanTddConfig, SubscriberProfile,
};
