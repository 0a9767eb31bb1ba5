//! APN and APN resource models.

use crate::error::{CoreError, CoreResult};
use crate::kinds::{entity_type, ConfigKind};
use crate::projection::{from_backend_config, to_backend_config, TypedConfig};
use cellsync_store::{EntityCreate, EntityRef, EntityUpdate, NetworkEntity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tracing::warn;

/// Aggregate maximum bitrate of an APN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregatedMaximumBitrate {
    /// Uplink limit in bits per second.
    pub max_bandwidth_ul: u32,
    /// Downlink limit in bits per second.
    pub max_bandwidth_dl: u32,
}

/// QoS profile of an APN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QosProfile {
    /// QoS class identifier.
    pub class_id: i32,
    /// Allocation and retention priority.
    pub priority_level: u32,
    /// May preempt lower-priority bearers.
    pub preemption_capability: bool,
    /// May be preempted by higher-priority bearers.
    pub preemption_vulnerability: bool,
}

/// APN settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApnConfiguration {
    /// Aggregate maximum bitrate.
    pub ambr: AggregatedMaximumBitrate,
    /// QoS profile.
    pub qos_profile: QosProfile,
}

impl TypedConfig for ApnConfiguration {
    const KIND: ConfigKind = ConfigKind::Apn;
}

/// An access point name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apn {
    /// APN name, the entity key.
    pub apn_name: String,
    /// APN settings.
    pub apn_configuration: ApnConfiguration,
}

impl Apn {
    /// Reference to the APN entity.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::APN, self.apn_name.as_str())
    }

    /// Rebuilds an APN from its entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the entity has no config.
    pub fn from_backend_models(entity: &NetworkEntity) -> CoreResult<Self> {
        let config = entity.config.as_ref().ok_or_else(|| {
            CoreError::config_not_found(entity.entity_ref().to_string(), ConfigKind::Apn)
        })?;
        Ok(Self {
            apn_name: entity.key.clone(),
            apn_configuration: from_backend_config(config)?,
        })
    }

    /// Builds the create for this APN.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an empty name.
    pub fn to_entity_create(&self) -> CoreResult<EntityCreate> {
        self.validate()?;
        Ok(EntityCreate::new(self.entity_ref())
            .with_config(to_backend_config(&self.apn_configuration)?))
    }

    /// Builds the update replacing this APN's config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an empty name.
    pub fn to_entity_update(&self) -> CoreResult<EntityUpdate> {
        self.validate()?;
        Ok(EntityUpdate::new(self.entity_ref())
            .with_config(to_backend_config(&self.apn_configuration)?))
    }

    fn validate(&self) -> CoreResult<()> {
        if self.apn_name.trim().is_empty() {
            return Err(CoreError::validation("apn name is empty"));
        }
        Ok(())
    }
}

/// A list of APN names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApnList(pub Vec<String>);

impl ApnList {
    /// Returns the APN entity references, deduplicated.
    #[must_use]
    pub fn to_assocs(&self) -> BTreeSet<EntityRef> {
        self.0
            .iter()
            .map(|name| EntityRef::new(entity_type::APN, name.as_str()))
            .collect()
    }
}

/// Per-gateway settings for one APN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnResource {
    /// Synthetic ID, the entity key. Generated when submitted empty.
    #[serde(default)]
    pub id: String,
    /// APN this resource configures.
    pub apn_name: String,
    /// Gateway IP on the APN's network.
    pub gateway_ip: Option<Ipv4Addr>,
    /// Gateway MAC on the APN's network.
    pub gateway_mac: Option<String>,
    /// VLAN carrying the APN's traffic.
    pub vlan_id: u32,
}

impl TypedConfig for ApnResource {
    const KIND: ConfigKind = ConfigKind::ApnResource;
}

impl ApnResource {
    /// Reference to the resource entity.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::APN_RESOURCE, self.id.as_str())
    }

    /// Reference to the APN this resource configures.
    #[must_use]
    pub fn apn_ref(&self) -> EntityRef {
        EntityRef::new(entity_type::APN, self.apn_name.as_str())
    }

    /// Builds the create for this resource, associated to its APN.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the resource fails to encode.
    pub fn to_entity_create(&self) -> CoreResult<EntityCreate> {
        Ok(EntityCreate::new(self.entity_ref())
            .with_config(to_backend_config(self)?)
            .with_associations([self.apn_ref()]))
    }

    /// Builds the update replacing this resource's config and resetting its
    /// association to its APN.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the resource fails to encode.
    pub fn to_entity_update(&self) -> CoreResult<EntityUpdate> {
        Ok(EntityUpdate::new(self.entity_ref())
            .with_config(to_backend_config(self)?)
            .with_associations_set([self.apn_ref()]))
    }

    /// Builds the update turning `stored` into this resource. Only the
    /// config and association set that differ are written, so an unchanged
    /// resource yields a no-op update.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the resource fails to encode.
    pub fn to_entity_update_from(&self, stored: &NetworkEntity) -> CoreResult<EntityUpdate> {
        Ok(self.to_entity_update()?.without_unchanged(stored))
    }

    /// Rebuilds a resource from its entity. The entity key wins over any ID
    /// stored in the payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the entity has no config.
    pub fn from_entity(entity: &NetworkEntity) -> CoreResult<Self> {
        let config = entity.config.as_ref().ok_or_else(|| {
            CoreError::config_not_found(entity.entity_ref().to_string(), ConfigKind::ApnResource)
        })?;
        let mut resource: ApnResource = from_backend_config(config)?;
        resource.id.clone_from(&entity.key);
        Ok(resource)
    }
}

/// A gateway's APN resources, keyed by APN name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApnResources(pub BTreeMap<String, ApnResource>);

impl ApnResources {
    /// Indexes the resources by ID.
    #[must_use]
    pub fn by_id(&self) -> BTreeMap<&str, &ApnResource> {
        self.0
            .values()
            .map(|resource| (resource.id.as_str(), resource))
            .collect()
    }

    /// Returns the resource entity references.
    #[must_use]
    pub fn to_refs(&self) -> BTreeSet<EntityRef> {
        self.0.values().map(ApnResource::entity_ref).collect()
    }

    /// Returns the APNs the resources configure.
    #[must_use]
    pub fn apn_list(&self) -> ApnList {
        ApnList(self.0.keys().cloned().collect())
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gives every resource without an ID a fresh random one.
    pub fn assign_missing_ids(&mut self) {
        for resource in self.0.values_mut() {
            if resource.id.trim().is_empty() {
                resource.id = uuid::Uuid::new_v4().to_string();
            }
        }
    }

    /// Checks every resource is keyed by its own APN name and that IDs are
    /// present and unique.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] describing the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = BTreeSet::new();
        for (apn_name, resource) in &self.0 {
            if apn_name.trim().is_empty() {
                return Err(CoreError::validation("apn resource keyed by an empty apn name"));
            }
            if *apn_name != resource.apn_name {
                return Err(CoreError::validation(format!(
                    "apn resource keyed by {apn_name} configures apn {}",
                    resource.apn_name
                )));
            }
            if resource.id.trim().is_empty() {
                return Err(CoreError::validation(format!(
                    "apn resource for {apn_name} has no id"
                )));
            }
            if !seen.insert(resource.id.as_str()) {
                return Err(CoreError::validation(format!(
                    "apn resource id {} is used more than once",
                    resource.id
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds the map from loaded resource entities. Entities of other
    /// types are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource's config is missing or does not decode.
    pub fn from_entities<'a>(
        entities: impl IntoIterator<Item = &'a NetworkEntity>,
    ) -> CoreResult<Self> {
        let mut resources = BTreeMap::new();
        for entity in entities {
            if entity.entity_type != entity_type::APN_RESOURCE {
                continue;
            }
            let resource = ApnResource::from_entity(entity)?;
            if let Some(previous) = resources.insert(resource.apn_name.clone(), resource) {
                warn!(
                    apn = %previous.apn_name,
                    dropped = %previous.id,
                    "two apn resources configure the same apn"
                );
            }
        }
        Ok(Self(resources))
    }
}

impl FromIterator<ApnResource> for ApnResources {
    fn from_iter<I: IntoIterator<Item = ApnResource>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|resource| (resource.apn_name.clone(), resource))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, apn: &str) -> ApnResource {
        ApnResource {
            id: id.into(),
            apn_name: apn.into(),
            gateway_ip: Some(Ipv4Addr::new(192, 168, 1, 1)),
            gateway_mac: None,
            vlan_id: 0,
        }
    }

    fn as_entity(create: EntityCreate) -> NetworkEntity {
        NetworkEntity {
            network_id: "lte1".into(),
            entity_type: create.entity.entity_type.clone(),
            key: create.entity.key.clone(),
            name: create.name,
            description: create.description,
            physical_id: None,
            config: create.config,
            associations: create.associations,
            parent_associations: BTreeSet::new(),
        }
    }

    #[test]
    fn resource_create_links_apn() {
        let create = resource("r1", "internet").to_entity_create().unwrap();
        assert_eq!(create.entity, EntityRef::new("apn_resource", "r1"));
        assert!(create.associations.contains(&EntityRef::new("apn", "internet")));
    }

    #[test]
    fn resource_update_sets_apn() {
        let update = resource("r1", "ims").to_entity_update().unwrap();
        let set = update.associations_to_set.unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&EntityRef::new("apn", "ims")));
    }

    #[test]
    fn resources_from_entities() {
        let entities = vec![
            as_entity(resource("r1", "internet").to_entity_create().unwrap()),
            as_entity(resource("r2", "ims").to_entity_create().unwrap()),
        ];
        let resources = ApnResources::from_entities(&entities).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources.by_id()["r2"].apn_name, "ims");
        assert_eq!(resources.apn_list(), ApnList(vec!["ims".into(), "internet".into()]));
        assert_eq!(resources.to_refs().len(), 2);
    }

    #[test]
    fn missing_ids_are_generated() {
        let mut resources: ApnResources =
            [resource("", "internet"), resource("r2", "ims")].into_iter().collect();
        resources.assign_missing_ids();

        let generated = &resources.0["internet"].id;
        assert!(uuid::Uuid::parse_str(generated).is_ok());
        assert_eq!(resources.0["ims"].id, "r2");
        assert!(resources.validate().is_ok());
    }

    #[test]
    fn validate_catches_bad_maps() {
        let mut mismatched = ApnResources::default();
        mismatched.0.insert("internet".into(), resource("r1", "ims"));
        assert!(mismatched.validate().is_err());

        let duplicated: ApnResources =
            [resource("r1", "internet"), resource("r1", "ims")].into_iter().collect();
        assert!(duplicated.validate().is_err());

        let unassigned: ApnResources = [resource("", "internet")].into_iter().collect();
        assert!(unassigned.validate().is_err());
    }

    #[test]
    fn apn_entity_roundtrip() {
        let apn = Apn {
            apn_name: "internet".into(),
            apn_configuration: ApnConfiguration {
                ambr: AggregatedMaximumBitrate {
                    max_bandwidth_ul: 100_000_000,
                    max_bandwidth_dl: 200_000_000,
                },
                qos_profile: QosProfile {
                    class_id: 9,
                    priority_level: 15,
                    preemption_capability: true,
                    preemption_vulnerability: false,
                },
            },
        };
        let entity = as_entity(apn.to_entity_create().unwrap());
        assert_eq!(Apn::from_backend_models(&entity).unwrap(), apn);

        let list = ApnList(vec!["internet".into(), "internet".into()]);
        assert_eq!(list.to_assocs().len(), 1);
    }
}
