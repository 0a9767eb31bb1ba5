//! Write plans for gateway changes.
//!
//! Each planner works off a [`DeltaContext`] whose snapshot already holds
//! everything the change touches (see [`gateway_write_refs`]). Planners
//! check their preconditions against the snapshot first and fail before
//! any write is composed.

use crate::error::{CoreError, CoreResult};
use crate::kinds::{entity_type, ConfigKind};
use crate::models::{EnodebSerials, GatewayCellularConfigs, MutableLteGateway};
use crate::projection::{rewrite_sub_config, to_backend_config, SubConfig};
use crate::sync::composer::{AssociationChange, WriteComposer, WritePlan};
use crate::sync::delta::DeltaContext;
use cellsync_store::{EntityCreate, EntityRef, EntityUpdate};
use std::collections::BTreeSet;
use tracing::debug;

/// Refs the first load of a gateway create or update needs: both gateway
/// entities, the tier, the requested eNodeBs and APNs, and the requested
/// APN resource IDs.
pub fn gateway_write_refs(gateway: &MutableLteGateway) -> BTreeSet<EntityRef> {
    let mut refs = BTreeSet::from([
        gateway.magmad_ref(),
        gateway.cellular_ref(),
        gateway.magmad_gateway().tier_ref(),
    ]);
    refs.extend(gateway.connected_enodeb_serials.to_refs());
    refs.extend(gateway.apn_resources.apn_list().to_assocs());
    refs.extend(
        gateway
            .apn_resources
            .0
            .values()
            .filter(|resource| !resource.id.is_empty())
            .map(|resource| resource.entity_ref()),
    );
    refs
}

/// Plans creation of a gateway: its APN resources, the cellular entity
/// pointing at its eNodeBs and resources, the magmad entity pointing at the
/// cellular one, and the tier's edge to the magmad entity.
///
/// # Errors
///
/// Returns [`CoreError::AlreadyExists`] if either gateway entity exists,
/// [`CoreError::ParentNotFound`] if the tier does not, or an error from
/// validation or the delta checks.
pub fn plan_gateway_create(
    ctx: &DeltaContext<'_>,
    gateway: &MutableLteGateway,
) -> CoreResult<WritePlan> {
    gateway.validate()?;
    let magmad_ref = gateway.magmad_ref();
    let cellular_ref = gateway.cellular_ref();
    for existing in [&magmad_ref, &cellular_ref] {
        if ctx.snapshot().contains(existing) {
            return Err(CoreError::AlreadyExists {
                what: format!("gateway {} ({existing})", gateway.id),
            });
        }
    }

    let magmad = gateway.magmad_gateway();
    ctx.require_parent(&magmad.tier_ref())?;

    let enodebs = gateway.connected_enodeb_serials.to_refs();
    ctx.check_enodeb_attachments(&cellular_ref, &enodebs)?;
    let resources = ctx.apn_resource_changes(&cellular_ref, &gateway.apn_resources)?;

    let mut creates = resources.creates;
    creates.push(
        EntityCreate::new(cellular_ref.clone())
            .with_labels(gateway.name.as_str(), gateway.description.as_str())
            .with_config(to_backend_config(&gateway.cellular)?)
            .with_associations(enodebs.into_iter().chain(resources.desired_refs)),
    );
    creates.push(
        EntityCreate::new(magmad_ref.clone())
            .with_labels(gateway.name.as_str(), gateway.description.as_str())
            .with_physical_id(gateway.device.hardware_id.as_str())
            .with_config(to_backend_config(&gateway.magmad)?)
            .with_associations([cellular_ref]),
    );

    let tier_link = AssociationChange::new(magmad.tier_ref()).adding([magmad_ref]);
    WriteComposer::new(ctx.config()).compose(creates, Vec::new(), Vec::new(), vec![tier_link])
}

/// Plans an update of an existing gateway.
///
/// Name and description are kept on both gateway entities. They and the
/// configs are written only when they differ from the stored values. The cellular entity's associations are reset to the
/// desired eNodeBs and APN resources; edges of other types are kept. A tier
/// change moves the tier edge.
///
/// # Errors
///
/// Returns [`CoreError::ParentNotFound`] if either gateway entity or the
/// tier is absent, [`CoreError::Validation`] if the hardware ID changes, or
/// an error from validation or the delta checks.
pub fn plan_gateway_update(
    ctx: &DeltaContext<'_>,
    gateway: &MutableLteGateway,
) -> CoreResult<WritePlan> {
    gateway.validate()?;
    let magmad_ref = gateway.magmad_ref();
    let cellular_ref = gateway.cellular_ref();
    let tier_ref = gateway.magmad_gateway().tier_ref();
    ctx.snapshot()
        .require_parents([&magmad_ref, &cellular_ref, &tier_ref])?;
    let magmad = ctx.require_parent(&magmad_ref)?;
    let cellular = ctx.require_parent(&cellular_ref)?;

    if magmad.physical_id.as_deref() != Some(gateway.device.hardware_id.as_str()) {
        return Err(CoreError::validation(format!(
            "hardware id of gateway {} cannot be changed",
            gateway.id
        )));
    }

    let mut magmad_update = EntityUpdate::new(magmad_ref.clone());
    if magmad.name != gateway.name {
        magmad_update.new_name = Some(gateway.name.clone());
    }
    if magmad.description != gateway.description {
        magmad_update.new_description = Some(gateway.description.clone());
    }
    let magmad_config = to_backend_config(&gateway.magmad)?;
    if magmad.config.as_ref() != Some(&magmad_config) {
        magmad_update.new_config = Some(magmad_config);
    }

    let mut cellular_update = EntityUpdate::new(cellular_ref.clone());
    if cellular.name != gateway.name {
        cellular_update.new_name = Some(gateway.name.clone());
    }
    if cellular.description != gateway.description {
        cellular_update.new_description = Some(gateway.description.clone());
    }
    let cellular_config = to_backend_config(&gateway.cellular)?;
    if cellular.config.as_ref() != Some(&cellular_config) {
        cellular_update.new_config = Some(cellular_config);
    }

    let enodebs = ctx.enodeb_changes(&cellular_ref, &gateway.connected_enodeb_serials)?;
    let resources = ctx.apn_resource_changes(&cellular_ref, &gateway.apn_resources)?;

    let desired: BTreeSet<EntityRef> = cellular
        .associations
        .iter()
        .filter(|target| {
            !target.is_type(entity_type::CELLULAR_ENODEB) && !target.is_type(entity_type::APN_RESOURCE)
        })
        .cloned()
        .chain(enodebs.resulting())
        .chain(resources.desired_refs.iter().cloned())
        .collect();

    let mut changes = Vec::new();
    if desired != cellular.associations {
        changes.push(AssociationChange::new(cellular_ref).setting(desired));
    }

    let current_tiers: BTreeSet<&EntityRef> = magmad.parents_of(entity_type::UPGRADE_TIER).collect();
    for old in current_tiers.iter().filter(|tier| ***tier != tier_ref) {
        debug!(gateway = %gateway.id, from = %old, to = %tier_ref, "moving gateway between tiers");
        changes.push(AssociationChange::new((*old).clone()).removing([magmad_ref.clone()]));
    }
    if !current_tiers.contains(&tier_ref) {
        changes.push(AssociationChange::new(tier_ref).adding([magmad_ref]));
    }

    let mut updates = resources.updates;
    updates.push(magmad_update);
    updates.push(cellular_update);
    WriteComposer::new(ctx.config()).compose(resources.creates, updates, resources.deletes, changes)
}

/// Plans deletion of a gateway and the APN resources it owns. eNodeBs are
/// detached, never deleted.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the magmad entity is absent.
pub fn plan_gateway_delete(ctx: &DeltaContext<'_>, gateway_id: &str) -> CoreResult<WritePlan> {
    let magmad_ref = EntityRef::new(entity_type::MAGMAD_GATEWAY, gateway_id);
    let cellular_ref = EntityRef::new(entity_type::CELLULAR_GATEWAY, gateway_id);
    ctx.snapshot().entity(&magmad_ref)?;

    let mut deletes = Vec::new();
    if let Some(cellular) = ctx.snapshot().get(&cellular_ref) {
        deletes.extend(
            cellular
                .associations_of(entity_type::APN_RESOURCE)
                .filter(|resource| ctx.snapshot().contains(resource))
                .cloned(),
        );
        deletes.push(cellular_ref);
    }
    deletes.push(magmad_ref);
    WriteComposer::new(ctx.config()).compose(Vec::new(), Vec::new(), deletes, Vec::new())
}

/// Plans replacing a gateway's eNodeB set. Associations of other types are
/// preserved. An unchanged set yields an empty plan.
///
/// # Errors
///
/// Returns [`CoreError::ParentNotFound`] if the cellular gateway is absent,
/// or an error from validation or the attachment checks.
pub fn plan_enodeb_serials_update(
    ctx: &DeltaContext<'_>,
    gateway_id: &str,
    serials: &EnodebSerials,
) -> CoreResult<WritePlan> {
    serials.validate()?;
    let cellular_ref = EntityRef::new(entity_type::CELLULAR_GATEWAY, gateway_id);
    let cellular = ctx.require_parent(&cellular_ref)?;

    let delta = ctx.enodeb_changes(&cellular_ref, serials)?;
    if delta.is_unchanged() {
        return Ok(WritePlan::empty());
    }

    let set: BTreeSet<EntityRef> = cellular
        .associations
        .iter()
        .filter(|target| !target.is_type(entity_type::CELLULAR_ENODEB))
        .cloned()
        .chain(delta.resulting())
        .collect();
    WriteComposer::new(ctx.config()).compose(
        Vec::new(),
        Vec::new(),
        Vec::new(),
        vec![AssociationChange::new(cellular_ref).setting(set)],
    )
}

/// Plans a read-modify-write of one part of a gateway's cellular config.
///
/// # Errors
///
/// Returns [`CoreError::ParentNotFound`] if the cellular gateway is absent,
/// [`CoreError::ConfigNotFound`] if it has no config, or a projection error.
pub fn plan_gateway_config_update<C>(
    ctx: &DeltaContext<'_>,
    gateway_id: &str,
    value: C,
) -> CoreResult<WritePlan>
where
    C: SubConfig<GatewayCellularConfigs>,
{
    let cellular_ref = EntityRef::new(entity_type::CELLULAR_GATEWAY, gateway_id);
    let cellular = ctx.require_parent(&cellular_ref)?;
    let payload = cellular.config.as_ref().ok_or_else(|| {
        CoreError::config_not_found(cellular_ref.to_string(), ConfigKind::CellularGateway)
    })?;

    let update = EntityUpdate::new(cellular_ref)
        .with_config(rewrite_sub_config::<GatewayCellularConfigs, C>(payload, value)?);
    WriteComposer::new(ctx.config()).compose(Vec::new(), vec![update], Vec::new(), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::models::{
        ApnResource, ApnResources, GatewayDevice, GatewayRanConfigs, MagmadGatewayConfigs,
    };
    use crate::sync::loader::Snapshot;
    use cellsync_store::{LoadResult, NetworkEntity, WriteOperation};

    fn entity(entity: EntityRef) -> NetworkEntity {
        NetworkEntity {
            network_id: "lte1".into(),
            entity_type: entity.entity_type,
            key: entity.key,
            name: String::new(),
            description: String::new(),
            physical_id: None,
            config: None,
            associations: BTreeSet::new(),
            parent_associations: BTreeSet::new(),
        }
    }

    fn gateway() -> MutableLteGateway {
        MutableLteGateway {
            id: "gw1".into(),
            name: "gateway".into(),
            description: "rooftop".into(),
            device: GatewayDevice {
                hardware_id: "hw-1".into(),
            },
            magmad: MagmadGatewayConfigs::default(),
            tier: "t1".into(),
            cellular: GatewayCellularConfigs::default(),
            connected_enodeb_serials: EnodebSerials(vec!["S1".into()]),
            apn_resources: [ApnResource {
                id: "r1".into(),
                apn_name: "internet".into(),
                gateway_ip: None,
                gateway_mac: None,
                vlan_id: 0,
            }]
            .into_iter()
            .collect::<ApnResources>(),
        }
    }

    fn base_entities() -> Vec<NetworkEntity> {
        vec![
            entity(EntityRef::new(entity_type::UPGRADE_TIER, "t1")),
            entity(EntityRef::new(entity_type::UPGRADE_TIER, "t2")),
            entity(EntityRef::new(entity_type::APN, "internet")),
            entity(EntityRef::new(entity_type::CELLULAR_ENODEB, "S1")),
            entity(EntityRef::new(entity_type::CELLULAR_ENODEB, "S2")),
        ]
    }

    fn snapshot(entities: Vec<NetworkEntity>) -> Snapshot {
        Snapshot::from_load_result(
            "lte1",
            LoadResult {
                entities,
                not_found: BTreeSet::new(),
            },
        )
    }

    // The stored form of `gateway()`, as a create plan would leave it.
    fn existing_entities() -> Vec<NetworkEntity> {
        let gw = gateway();
        let mut entities = base_entities();
        let magmad_ref = gw.magmad_ref();
        let cellular_ref = gw.cellular_ref();
        let resource = gw.apn_resources.0["internet"].clone();

        let mut magmad = entity(magmad_ref.clone());
        magmad.name = gw.name.clone();
        magmad.description = gw.description.clone();
        magmad.physical_id = Some("hw-1".into());
        magmad.config = Some(to_backend_config(&gw.magmad).unwrap());
        magmad.associations.insert(cellular_ref.clone());
        magmad
            .parent_associations
            .insert(EntityRef::new(entity_type::UPGRADE_TIER, "t1"));

        let mut cellular = entity(cellular_ref.clone());
        cellular.name = gw.name.clone();
        cellular.description = gw.description.clone();
        cellular.config = Some(to_backend_config(&gw.cellular).unwrap());
        cellular.associations.extend([
            EntityRef::new(entity_type::CELLULAR_ENODEB, "S1"),
            resource.entity_ref(),
        ]);

        let mut stored = entity(resource.entity_ref());
        stored.config = Some(to_backend_config(&resource).unwrap());
        stored.associations.insert(resource.apn_ref());

        for e in entities.iter_mut() {
            if e.key == "S1" {
                e.parent_associations.insert(cellular_ref.clone());
            }
        }
        entities.extend([magmad, cellular, stored]);
        entities
    }

    #[test]
    fn create_plan_orders_children_first() {
        let snapshot = snapshot(base_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let plan = plan_gateway_create(&ctx, &gateway()).unwrap();
        let targets: Vec<String> = plan.operations().iter().map(|op| op.to_string()).collect();
        assert_eq!(
            targets,
            vec![
                "create apn_resource:r1",
                "create cellular_gateway:gw1",
                "create magmad_gateway:gw1",
                "update upgrade_tier:t1",
            ]
        );
    }

    #[test]
    fn create_plan_rejects_existing_gateway() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);
        let err = plan_gateway_create(&ctx, &gateway()).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
    }

    #[test]
    fn create_plan_requires_tier() {
        let entities = base_entities()
            .into_iter()
            .filter(|e| e.key != "t1")
            .collect();
        let snapshot = snapshot(entities);
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);
        let err = plan_gateway_create(&ctx, &gateway()).unwrap_err();
        assert!(matches!(err, CoreError::ParentNotFound { .. }));
    }

    #[test]
    fn unchanged_gateway_plans_nothing() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let plan = plan_gateway_update(&ctx, &gateway()).unwrap();
        assert!(plan.is_empty(), "{:?}", plan.operations());
    }

    #[test]
    fn changed_resource_vlan_rewrites_only_its_config() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let mut desired = gateway();
        if let Some(resource) = desired.apn_resources.0.get_mut("internet") {
            resource.vlan_id = 42;
        }
        let plan = plan_gateway_update(&ctx, &desired).unwrap();
        assert_eq!(plan.len(), 1);
        let WriteOperation::Update(update) = &plan.operations()[0] else {
            panic!("expected an update");
        };
        assert_eq!(update.entity, EntityRef::new(entity_type::APN_RESOURCE, "r1"));
        assert!(update.new_config.is_some());
        assert!(update.associations_to_set.is_none());
    }

    #[test]
    fn create_plan_labels_both_gateway_entities() {
        let snapshot = snapshot(base_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let plan = plan_gateway_create(&ctx, &gateway()).unwrap();
        let labelled: Vec<(String, String)> = plan
            .operations()
            .iter()
            .filter_map(|op| match op {
                WriteOperation::Create(create) if create.entity.key == "gw1" => {
                    Some((create.name.clone(), create.description.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(labelled.len(), 2);
        for (name, description) in labelled {
            assert_eq!(name, "gateway");
            assert_eq!(description, "rooftop");
        }
    }

    #[test]
    fn update_plan_moves_tier_and_enodebs() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let mut desired = gateway();
        desired.tier = "t2".into();
        desired.connected_enodeb_serials = EnodebSerials(vec!["S2".into()]);
        desired.name = "renamed".into();

        let plan = plan_gateway_update(&ctx, &desired).unwrap();
        let mut cellular_set = None;
        let mut tier_ops = Vec::new();
        for op in plan.operations() {
            if let WriteOperation::Update(update) = op {
                match update.entity.entity_type.as_str() {
                    entity_type::CELLULAR_GATEWAY => {
                        assert_eq!(update.new_name.as_deref(), Some("renamed"));
                        cellular_set.clone_from(&update.associations_to_set);
                    }
                    entity_type::UPGRADE_TIER => tier_ops.push(update.clone()),
                    entity_type::MAGMAD_GATEWAY => {
                        assert_eq!(update.new_name.as_deref(), Some("renamed"));
                        assert!(update.new_config.is_none());
                    }
                    _ => {}
                }
            }
        }

        let set = cellular_set.unwrap();
        assert!(set.contains(&EntityRef::new(entity_type::CELLULAR_ENODEB, "S2")));
        assert!(!set.contains(&EntityRef::new(entity_type::CELLULAR_ENODEB, "S1")));
        assert!(set.contains(&EntityRef::new(entity_type::APN_RESOURCE, "r1")));
        assert_eq!(tier_ops.len(), 2);
    }

    #[test]
    fn update_plan_requires_both_gateway_entities() {
        let snapshot = snapshot(base_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);
        let err = plan_gateway_update(&ctx, &gateway()).unwrap_err();
        let CoreError::ParentNotFound { missing } = err else {
            panic!("expected parent not found");
        };
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn hardware_id_is_immutable() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);
        let mut desired = gateway();
        desired.device.hardware_id = "hw-2".into();
        assert!(matches!(
            plan_gateway_update(&ctx, &desired),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn delete_plan_keeps_enodebs() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let plan = plan_gateway_delete(&ctx, "gw1").unwrap();
        assert_eq!(plan.delete_count(), 3);
        assert!(plan
            .operations()
            .iter()
            .all(|op| !op.target().is_type(entity_type::CELLULAR_ENODEB)));

        assert!(plan_gateway_delete(&ctx, "gw9").unwrap_err().is_not_found());
    }

    #[test]
    fn serials_update_preserves_other_edges() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let plan = plan_enodeb_serials_update(&ctx, "gw1", &EnodebSerials::default()).unwrap();
        assert_eq!(plan.len(), 1);
        let WriteOperation::Update(update) = &plan.operations()[0] else {
            panic!("expected update");
        };
        assert_eq!(
            update.associations_to_set,
            Some(BTreeSet::from([EntityRef::new(entity_type::APN_RESOURCE, "r1")]))
        );

        let unchanged =
            plan_enodeb_serials_update(&ctx, "gw1", &EnodebSerials(vec!["S1".into()])).unwrap();
        assert!(unchanged.is_empty());
    }

    #[test]
    fn sub_config_update_rewrites_parent() {
        let snapshot = snapshot(existing_entities());
        let config = SyncConfig::default();
        let ctx = DeltaContext::new("lte1", &snapshot, &config);

        let ran = GatewayRanConfigs {
            pci: 9,
            transmit_enabled: true,
        };
        let plan = plan_gateway_config_update(&ctx, "gw1", ran).unwrap();
        let WriteOperation::Update(update) = &plan.operations()[0] else {
            panic!("expected update");
        };
        assert!(update.new_config.is_some());
        assert!(!update.touches_associations());
    }
}
