//! Gateway models.
//!
//! A gateway is stored as two entities sharing one key: a generic
//! `magmad_gateway` carrying the device and management config, and a
//! `cellular_gateway` carrying the LTE config and the gateway's edges to
//! eNodeBs and APN resources. The magmad entity links to the cellular one.

use crate::error::{CoreError, CoreResult};
use crate::kinds::{entity_type, ConfigKind};
use crate::models::ApnResources;
use crate::projection::{from_backend_config, SubConfig, TypedConfig};
use cellsync_store::{EntityRef, NetworkEntity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Physical device backing a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDevice {
    /// Hardware ID, stored as the magmad entity's physical ID.
    pub hardware_id: String,
}

/// Gateway management config.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MagmadGatewayConfigs {
    /// Seconds between check-ins.
    pub checkin_interval: u32,
    /// Seconds before a check-in times out.
    pub checkin_timeout: u32,
    /// Apply package upgrades automatically.
    pub autoupgrade_enabled: bool,
    /// Seconds between upgrade polls.
    pub autoupgrade_poll_interval: u32,
    /// Services started on demand.
    pub dynamic_services: Vec<String>,
    /// Feature flag overrides.
    pub feature_flags: BTreeMap<String, bool>,
}

/// A generic gateway as stored on the magmad entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagmadGateway {
    /// Gateway ID, the key of both gateway entities.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Backing device, if registered.
    pub device: Option<GatewayDevice>,
    /// Management config.
    pub magmad: MagmadGatewayConfigs,
    /// Upgrade tier the gateway belongs to.
    pub tier: String,
}

/// LTE config of a gateway, stored as one composite payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayCellularConfigs {
    /// EPC settings.
    pub epc: GatewayEpcConfigs,
    /// RAN settings.
    pub ran: GatewayRanConfigs,
    /// CSFB settings, if the gateway serves non-EPS traffic.
    pub non_eps_service: Option<GatewayNonEpsConfigs>,
}

/// Gateway EPC settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayEpcConfigs {
    /// UE address pool.
    pub ip_block: String,
    /// Masquerade UE traffic.
    pub nat_enabled: bool,
    /// Primary DNS server handed to UEs.
    pub dns_primary: Option<String>,
    /// Secondary DNS server handed to UEs.
    pub dns_secondary: Option<String>,
    /// IPv6 UE address pool.
    pub ipv6_block: Option<String>,
    /// VLAN of the SGi management interface.
    pub sgi_management_iface_vlan: Option<String>,
}

/// Gateway RAN settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayRanConfigs {
    /// Physical cell ID.
    pub pci: u32,
    /// Radio transmit enabled.
    pub transmit_enabled: bool,
}

/// Gateway CSFB settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatewayNonEpsConfigs {
    /// CSFB mobile country code.
    pub csfb_mcc: String,
    /// CSFB mobile network code.
    pub csfb_mnc: String,
    /// Location area code.
    pub lac: u32,
    /// Fallback radio access technology.
    pub csfb_rat: u32,
    /// 2G ARFCNs.
    pub arfcn_2g: Vec<u32>,
    /// Non-EPS service control mode.
    pub non_eps_service_control: u32,
}

impl TypedConfig for MagmadGatewayConfigs {
    const KIND: ConfigKind = ConfigKind::MagmadGateway;
}

impl TypedConfig for GatewayCellularConfigs {
    const KIND: ConfigKind = ConfigKind::CellularGateway;
}

impl SubConfig<GatewayCellularConfigs> for GatewayCellularConfigs {
    fn extract(parent: &GatewayCellularConfigs) -> Option<Self> {
        Some(parent.clone())
    }

    fn replace_in(self, parent: &mut GatewayCellularConfigs) {
        *parent = self;
    }
}

impl SubConfig<GatewayCellularConfigs> for GatewayEpcConfigs {
    fn extract(parent: &GatewayCellularConfigs) -> Option<Self> {
        Some(parent.epc.clone())
    }

    fn replace_in(self, parent: &mut GatewayCellularConfigs) {
        parent.epc = self;
    }
}

impl SubConfig<GatewayCellularConfigs> for GatewayRanConfigs {
    fn extract(parent: &GatewayCellularConfigs) -> Option<Self> {
        Some(parent.ran.clone())
    }

    fn replace_in(self, parent: &mut GatewayCellularConfigs) {
        parent.ran = self;
    }
}

impl SubConfig<GatewayCellularConfigs> for GatewayNonEpsConfigs {
    fn extract(parent: &GatewayCellularConfigs) -> Option<Self> {
        parent.non_eps_service.clone()
    }

    fn replace_in(self, parent: &mut GatewayCellularConfigs) {
        parent.non_eps_service = Some(self);
    }
}

/// Serials of the eNodeBs attached to a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnodebSerials(pub Vec<String>);

impl EnodebSerials {
    /// Returns the serials sorted and deduplicated.
    #[must_use]
    pub fn normalized(&self) -> BTreeSet<String> {
        self.0.iter().cloned().collect()
    }

    /// Returns the eNodeB entity references.
    #[must_use]
    pub fn to_refs(&self) -> BTreeSet<EntityRef> {
        self.0
            .iter()
            .map(|serial| EntityRef::new(entity_type::CELLULAR_ENODEB, serial.as_str()))
            .collect()
    }

    /// Rejects empty serials.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first bad entry.
    pub fn validate(&self) -> CoreResult<()> {
        match self.0.iter().position(|serial| serial.trim().is_empty()) {
            Some(index) => Err(CoreError::validation(format!(
                "enodeb serial at position {index} is empty"
            ))),
            None => Ok(()),
        }
    }

    /// Reads the serials off a cellular gateway entity, sorted.
    #[must_use]
    pub fn from_cellular_entity(cellular: &NetworkEntity) -> Self {
        Self(
            cellular
                .associations_of(entity_type::CELLULAR_ENODEB)
                .map(|assoc| assoc.key.clone())
                .collect(),
        )
    }
}

impl From<Vec<String>> for EnodebSerials {
    fn from(serials: Vec<String>) -> Self {
        Self(serials)
    }
}

impl MagmadGateway {
    /// Rebuilds a gateway from its magmad entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the entity has no magmad
    /// config, or a projection error if it does not decode.
    pub fn from_backend_models(magmad: &NetworkEntity) -> CoreResult<Self> {
        let config = magmad.config.as_ref().ok_or_else(|| {
            CoreError::config_not_found(magmad.entity_ref().to_string(), ConfigKind::MagmadGateway)
        })?;

        Ok(Self {
            id: magmad.key.clone(),
            name: magmad.name.clone(),
            description: magmad.description.clone(),
            device: magmad.physical_id.clone().map(|hardware_id| GatewayDevice { hardware_id }),
            magmad: from_backend_config(config)?,
            tier: magmad
                .parents_of(entity_type::UPGRADE_TIER)
                .next()
                .map(|tier| tier.key.clone())
                .unwrap_or_default(),
        })
    }

    /// Reference to the magmad entity.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::MAGMAD_GATEWAY, self.id.as_str())
    }

    /// Reference to the gateway's tier.
    #[must_use]
    pub fn tier_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::UPGRADE_TIER, self.tier.as_str())
    }
}

/// An LTE gateway as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LteGateway {
    /// Gateway ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Backing device, if registered.
    pub device: Option<GatewayDevice>,
    /// Management config.
    pub magmad: MagmadGatewayConfigs,
    /// Upgrade tier.
    pub tier: String,
    /// LTE config.
    pub cellular: GatewayCellularConfigs,
    /// Attached eNodeBs, sorted.
    pub connected_enodeb_serials: EnodebSerials,
    /// APN resources by APN name.
    pub apn_resources: ApnResources,
}

impl LteGateway {
    /// Builds a gateway from its magmad and cellular entities plus the APN
    /// resources the cellular entity points at.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if either gateway entity lacks
    /// its config, or a projection error if a payload does not decode.
    pub fn from_backend_models(
        magmad: &NetworkEntity,
        cellular: &NetworkEntity,
        apn_resources: &[NetworkEntity],
    ) -> CoreResult<Self> {
        let MagmadGateway {
            id,
            name,
            description,
            device,
            magmad,
            tier,
        } = MagmadGateway::from_backend_models(magmad)?;

        let cellular_config = cellular.config.as_ref().ok_or_else(|| {
            CoreError::config_not_found(
                cellular.entity_ref().to_string(),
                ConfigKind::CellularGateway,
            )
        })?;

        Ok(Self {
            id,
            name,
            description,
            device,
            magmad,
            tier,
            cellular: from_backend_config(cellular_config)?,
            connected_enodeb_serials: EnodebSerials::from_cellular_entity(cellular),
            apn_resources: ApnResources::from_entities(apn_resources)?,
        })
    }
}

/// An LTE gateway as submitted for create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableLteGateway {
    /// Gateway ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Backing device.
    pub device: GatewayDevice,
    /// Management config.
    pub magmad: MagmadGatewayConfigs,
    /// Upgrade tier.
    pub tier: String,
    /// LTE config.
    pub cellular: GatewayCellularConfigs,
    /// eNodeBs to attach.
    pub connected_enodeb_serials: EnodebSerials,
    /// APN resources by APN name.
    #[serde(default)]
    pub apn_resources: ApnResources,
}

impl MutableLteGateway {
    /// The generic gateway part of this gateway.
    #[must_use]
    pub fn magmad_gateway(&self) -> MagmadGateway {
        MagmadGateway {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            device: Some(self.device.clone()),
            magmad: self.magmad.clone(),
            tier: self.tier.clone(),
        }
    }

    /// Reference to the magmad entity.
    #[must_use]
    pub fn magmad_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::MAGMAD_GATEWAY, self.id.as_str())
    }

    /// Reference to the cellular entity.
    #[must_use]
    pub fn cellular_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::CELLULAR_GATEWAY, self.id.as_str())
    }

    /// Checks the gateway is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an empty ID, tier or hardware
    /// ID, an empty eNodeB serial, or inconsistent APN resources.
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::validation("gateway id is empty"));
        }
        if self.tier.trim().is_empty() {
            return Err(CoreError::validation(format!("gateway {} has no tier", self.id)));
        }
        if self.device.hardware_id.trim().is_empty() {
            return Err(CoreError::validation(format!(
                "gateway {} has an empty hardware id",
                self.id
            )));
        }
        self.connected_enodeb_serials.validate()?;
        self.apn_resources.validate()
    }
}

impl From<LteGateway> for MutableLteGateway {
    fn from(gateway: LteGateway) -> Self {
        let LteGateway {
            id,
            name,
            description,
            device,
            magmad,
            tier,
            cellular,
            connected_enodeb_serials,
            apn_resources,
        } = gateway;

        Self {
            id,
            name,
            description,
            device: device.unwrap_or(GatewayDevice {
                hardware_id: String::new(),
            }),
            magmad,
            tier,
            cellular,
            connected_enodeb_serials,
            apn_resources,
        }
    }
}
