//! eNodeB model.

use crate::error::{CoreError, CoreResult};
use crate::kinds::{entity_type, ConfigKind};
use crate::projection::{from_backend_config, to_backend_config, TypedConfig};
use cellsync_store::{EntityCreate, EntityRef, EntityUpdate, NetworkEntity};
use serde::{Deserialize, Serialize};

/// Radio settings pushed to an eNodeB.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnodebConfiguration {
    /// Device model.
    pub device_class: String,
    /// Channel bandwidth in MHz.
    pub bandwidth_mhz: Option<u32>,
    /// Cell ID.
    pub cell_id: u32,
    /// Downlink EARFCN.
    pub earfcndl: Option<u32>,
    /// Physical cell ID.
    pub pci: Option<u32>,
    /// Special subframe pattern.
    pub special_subframe_pattern: Option<u32>,
    /// Subframe assignment.
    pub subframe_assignment: Option<u32>,
    /// Tracking area code.
    pub tac: Option<u32>,
    /// Radio transmit enabled.
    pub transmit_enabled: bool,
}

impl TypedConfig for EnodebConfiguration {
    const KIND: ConfigKind = ConfigKind::CellularEnodeb;
}

/// An eNodeB, keyed by hardware serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enodeb {
    /// Hardware serial.
    pub serial: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Radio settings.
    pub config: Option<EnodebConfiguration>,
    /// Gateway the eNodeB is attached to. Read-only; attachment is managed
    /// from the gateway side.
    #[serde(default, skip_deserializing)]
    pub attached_gateway_id: Option<String>,
}

impl Enodeb {
    /// Rebuilds an eNodeB from its entity.
    ///
    /// # Errors
    ///
    /// Returns a projection error if the config does not decode.
    pub fn from_backend_models(entity: &NetworkEntity) -> CoreResult<Self> {
        Ok(Self {
            serial: entity.key.clone(),
            name: entity.name.clone(),
            description: entity.description.clone(),
            config: entity.config.as_ref().map(from_backend_config).transpose()?,
            attached_gateway_id: entity
                .parents_of(entity_type::CELLULAR_GATEWAY)
                .next()
                .map(|gateway| gateway.key.clone()),
        })
    }

    /// Reference to the eNodeB entity.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::CELLULAR_ENODEB, self.serial.as_str())
    }

    /// Builds the create for this eNodeB.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an empty serial, or a codec
    /// error if the config fails to encode.
    pub fn to_entity_create(&self) -> CoreResult<EntityCreate> {
        self.validate()?;
        let mut create = EntityCreate::new(self.entity_ref())
            .with_labels(self.name.as_str(), self.description.as_str());
        if let Some(config) = &self.config {
            create = create.with_config(to_backend_config(config)?);
        }
        Ok(create)
    }

    /// Builds the update that replaces this eNodeB's name, description and
    /// config. Associations are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the eNodeB has no config, or a
    /// codec error if it fails to encode.
    pub fn to_entity_update(&self) -> CoreResult<EntityUpdate> {
        self.validate()?;
        let config = self.config.as_ref().ok_or_else(|| {
            CoreError::validation(format!("enodeb {} update carries no config", self.serial))
        })?;

        let mut update = EntityUpdate::new(self.entity_ref()).with_config(to_backend_config(config)?);
        update.new_name = Some(self.name.clone());
        update.new_description = Some(self.description.clone());
        Ok(update)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.serial.trim().is_empty() {
            return Err(CoreError::validation("enodeb serial is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn enodeb() -> Enodeb {
        Enodeb {
            serial: "S1".into(),
            name: "roof".into(),
            description: "north sector".into(),
            config: Some(EnodebConfiguration {
                device_class: "Baicells Nova-233 G2 OD FDD".into(),
                cell_id: 138_777_000,
                transmit_enabled: true,
                ..EnodebConfiguration::default()
            }),
            attached_gateway_id: None,
        }
    }

    #[test]
    fn entity_roundtrip_reports_attachment() {
        let create = enodeb().to_entity_create().unwrap();
        let mut parents = BTreeSet::new();
        parents.insert(EntityRef::new(entity_type::CELLULAR_GATEWAY, "gw1"));

        let entity = NetworkEntity {
            network_id: "lte1".into(),
            entity_type: create.entity.entity_type.clone(),
            key: create.entity.key.clone(),
            name: create.name,
            description: create.description,
            physical_id: None,
            config: create.config,
            associations: BTreeSet::new(),
            parent_associations: parents,
        };

        let read = Enodeb::from_backend_models(&entity).unwrap();
        assert_eq!(read.attached_gateway_id.as_deref(), Some("gw1"));
        assert_eq!(read.config, enodeb().config);
        assert_eq!(read.name, "roof");
    }

    #[test]
    fn update_sets_labels_and_config() {
        let update = enodeb().to_entity_update().unwrap();
        assert_eq!(update.new_name.as_deref(), Some("roof"));
        assert!(update.new_config.is_some());
        assert!(!update.touches_associations());
    }

    #[test]
    fn update_requires_config() {
        let mut bare = enodeb();
        bare.config = None;
        assert!(matches!(
            bare.to_entity_update(),
            Err(CoreError::Validation { .. })
        ));
        assert!(bare.to_entity_create().unwrap().config.is_none());
    }

    #[test]
    fn empty_serial_is_rejected() {
        let mut bad = enodeb();
        bad.serial = String::new();
        assert!(bad.to_entity_create().is_err());
    }
}
