//! End-to-end gateway scenarios against a seeded in-memory network.

use cellsync_core::sync::{plan_enodeb_serials_update, DeltaContext, LoadOptions, SnapshotLoader};
use cellsync_core::{entity_type, ErrorClass};
use cellsync_store::LoadCriteria;
use cellsync_testkit::prelude::*;
use std::collections::BTreeSet;

fn serials(values: &[&str]) -> EnodebSerials {
    EnodebSerials(values.iter().map(|s| (*s).to_string()).collect())
}

fn attached_to(net: &TestNetwork, serial: &str) -> Option<String> {
    net.load_enodeb(TEST_NETWORK, serial).unwrap().attached_gateway_id
}

#[test]
fn gateway_lifecycle() {
    let net = TestNetwork::seeded();
    let mut gateway = gateway_with_serials("gw1", &["S1"]);
    gateway.apn_resources = resources([("internet", "r1", 10)]);

    net.create_gateway(TEST_NETWORK, &gateway).unwrap();
    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.name, gateway.name);
    assert_eq!(loaded.tier, TEST_TIER);
    assert_eq!(loaded.cellular, gateway.cellular);
    assert_eq!(loaded.connected_enodeb_serials, serials(&["S1"]));
    assert_eq!(loaded.apn_resources, gateway.apn_resources);
    assert_eq!(MutableLteGateway::from(loaded), gateway);
    assert_eq!(attached_to(&net, "S1").as_deref(), Some("gw1"));

    assert!(matches!(
        net.create_gateway(TEST_NETWORK, &gateway),
        Err(CoreError::AlreadyExists { .. })
    ));

    net.delete_gateway(TEST_NETWORK, "gw1").unwrap();
    assert!(net.load_gateway(TEST_NETWORK, "gw1").unwrap_err().is_not_found());
    assert!(!net
        .store()
        .contains(TEST_NETWORK, &EntityRef::new(entity_type::APN_RESOURCE, "r1")));
    // eNodeBs and APNs outlive the gateway.
    assert_eq!(attached_to(&net, "S1"), None);
    assert!(net.load_apn(TEST_NETWORK, "internet").is_ok());
    assert!(net.delete_gateway(TEST_NETWORK, "gw1").unwrap_err().is_not_found());
}

#[test]
fn enodeb_serials_are_replaced() {
    let net = TestNetwork::seeded();
    net.create_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S1", "S2"]))
        .unwrap();

    net.update_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S3", "S2"]))
        .unwrap();

    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.connected_enodeb_serials, serials(&["S2", "S3"]));
    assert_eq!(attached_to(&net, "S1"), None);
    assert_eq!(attached_to(&net, "S3").as_deref(), Some("gw1"));
    assert!(net.load_enodeb(TEST_NETWORK, "S1").is_ok());
}

#[test]
fn apn_resources_keep_ids_and_grow() {
    let net = TestNetwork::seeded();
    let mut gateway = sample_gateway("gw1");
    gateway.apn_resources = resources([("internet", "r1", 10)]);
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    // The caller does not know the stored ID of the internet resource.
    gateway.apn_resources = resources([("internet", "", 20), ("ims", "r2", 30)]);
    let plan = net.plan_update_gateway(TEST_NETWORK, &gateway).unwrap();
    let summary = plan_summary(&plan);
    assert_eq!(plan.create_count(), 1, "{summary:?}");
    assert_eq!(plan.delete_count(), 0, "{summary:?}");
    assert!(summary.contains(&"create apn_resource:r2".to_string()));
    assert!(summary.contains(&"update apn_resource:r1".to_string()));

    let cellular_set = plan
        .operations()
        .iter()
        .find_map(|op| match op {
            WriteOperation::Update(update) if update.entity.is_type(entity_type::CELLULAR_GATEWAY) => {
                update.associations_to_set.clone()
            }
            _ => None,
        })
        .expect("cellular association set");
    assert!(cellular_set.contains(&EntityRef::new(entity_type::APN_RESOURCE, "r2")));
    assert!(cellular_set.contains(&EntityRef::new(entity_type::APN_RESOURCE, "r1")));

    net.submit(TEST_NETWORK, plan).unwrap();
    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.apn_resources.0["internet"].id, "r1");
    assert_eq!(loaded.apn_resources.0["internet"].vlan_id, 20);
    assert_eq!(loaded.apn_resources.0["ims"].id, "r2");
}

#[test]
fn dropped_apn_resource_is_deleted() {
    let net = TestNetwork::seeded();
    let mut gateway = sample_gateway("gw1");
    gateway.apn_resources = resources([("internet", "r1", 10), ("ims", "r2", 20)]);
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    gateway.apn_resources = resources([("ims", "r2", 20)]);
    net.update_gateway(TEST_NETWORK, &gateway).unwrap();

    let resource = EntityRef::new(entity_type::APN_RESOURCE, "r1");
    assert!(!net.store().contains(TEST_NETWORK, &resource));
    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.apn_resources.apn_list().0, vec!["ims"]);
}

#[test]
fn resource_moved_between_apns_is_updated_in_place() {
    let net = TestNetwork::seeded();
    let mut gateway = sample_gateway("gw1");
    gateway.apn_resources = resources([("internet", "r1", 10)]);
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    gateway.apn_resources = resources([("ims", "r1", 10)]);
    let plan = net.plan_update_gateway(TEST_NETWORK, &gateway).unwrap();
    assert_eq!(plan.create_count(), 0);
    assert_eq!(plan.delete_count(), 0);

    net.submit(TEST_NETWORK, plan).unwrap();
    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.apn_resources, resources([("ims", "r1", 10)]));
    assert!(net.delete_apn(TEST_NETWORK, "internet").is_ok());
}

#[test]
fn missing_parent_fails_before_any_write() {
    let net = TestNetwork::seeded();
    let before = net.write_calls();

    let err = net
        .update_gateway(TEST_NETWORK, &sample_gateway("ghost"))
        .unwrap_err();
    match &err {
        CoreError::ParentNotFound { missing } => {
            assert!(missing.contains(&EntityRef::new(entity_type::MAGMAD_GATEWAY, "ghost")));
            assert!(missing.contains(&EntityRef::new(entity_type::CELLULAR_GATEWAY, "ghost")));
        }
        other => panic!("expected ParentNotFound, got {other:?}"),
    }
    assert_eq!(err.class(), ErrorClass::NotFound);

    let mut gateway = sample_gateway("gw1");
    gateway.tier = "nowhere".into();
    assert!(matches!(
        net.create_gateway(TEST_NETWORK, &gateway),
        Err(CoreError::ParentNotFound { .. })
    ));
    assert_eq!(net.write_calls(), before);
}

#[test]
fn empty_serials_clear_the_relation_only() {
    let net = TestNetwork::seeded();
    net.create_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S1"]))
        .unwrap();

    let cellular = EntityRef::new(entity_type::CELLULAR_GATEWAY, "gw1");
    let snapshot = SnapshotLoader::new(net.store(), TEST_NETWORK)
        .load(&BTreeSet::from([cellular.clone()]), LoadOptions::associations_only())
        .unwrap();
    let plan = plan_enodeb_serials_update(
        &DeltaContext::new(TEST_NETWORK, &snapshot, net.config()),
        "gw1",
        &EnodebSerials::default(),
    )
    .unwrap();

    match plan.operations() {
        [WriteOperation::Update(update)] => {
            assert_eq!(update.entity, cellular);
            assert_eq!(update.associations_to_set, Some(BTreeSet::new()));
        }
        ops => panic!("expected a single association set, got {ops:?}"),
    }
    assert_eq!(plan.delete_count(), 0);

    net.submit(TEST_NETWORK, plan).unwrap();
    assert!(net.load_enodeb_serials(TEST_NETWORK, "gw1").unwrap().0.is_empty());
    assert!(net.load_enodeb(TEST_NETWORK, "S1").is_ok());
}

#[test]
fn serial_add_and_remove() {
    let net = TestNetwork::seeded();
    net.create_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S1"]))
        .unwrap();

    net.add_enodeb_serial(TEST_NETWORK, "gw1", "S3").unwrap();
    let writes = net.write_calls();
    net.add_enodeb_serial(TEST_NETWORK, "gw1", "S3").unwrap();
    assert_eq!(net.write_calls(), writes);
    assert_eq!(
        net.load_enodeb_serials(TEST_NETWORK, "gw1").unwrap(),
        serials(&["S1", "S3"])
    );

    net.remove_enodeb_serial(TEST_NETWORK, "gw1", "S1").unwrap();
    assert_eq!(
        net.load_enodeb_serials(TEST_NETWORK, "gw1").unwrap(),
        serials(&["S3"])
    );
    assert!(net
        .remove_enodeb_serial(TEST_NETWORK, "gw1", "S1")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn serial_update_keeps_apn_resources() {
    let net = TestNetwork::seeded();
    let mut gateway = gateway_with_serials("gw1", &["S1"]);
    gateway.apn_resources = resources([("internet", "r1", 10)]);
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    net.update_enodeb_serials(TEST_NETWORK, "gw1", &serials(&["S2"]))
        .unwrap();

    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.connected_enodeb_serials, serials(&["S2"]));
    assert_eq!(loaded.apn_resources, gateway.apn_resources);
}

#[test]
fn enodeb_attachment_rules() {
    let net = TestNetwork::seeded();
    net.create_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S1"]))
        .unwrap();

    let err = net
        .create_gateway(TEST_NETWORK, &gateway_with_serials("gw2", &["S1"]))
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }), "{err:?}");

    let err = net
        .create_gateway(TEST_NETWORK, &gateway_with_serials("gw2", &["S9"]))
        .unwrap_err();
    assert!(matches!(err, CoreError::DanglingAssociation { .. }), "{err:?}");

    let relaxed = TestNetwork::seeded_with(SyncConfig::new().enforce_single_enodeb_attachment(false));
    relaxed
        .create_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S1"]))
        .unwrap();
    relaxed
        .create_gateway(TEST_NETWORK, &gateway_with_serials("gw2", &["S1"]))
        .unwrap();
}

#[test]
fn unknown_apn_is_rejected() {
    let net = TestNetwork::seeded();
    let mut gateway = sample_gateway("gw1");
    gateway.apn_resources = resources([("nope", "r1", 1)]);
    let before = net.write_calls();
    assert!(matches!(
        net.create_gateway(TEST_NETWORK, &gateway),
        Err(CoreError::DanglingAssociation { .. })
    ));
    assert_eq!(net.write_calls(), before);
}

#[test]
fn hardware_id_is_immutable() {
    let net = TestNetwork::seeded();
    let mut gateway = sample_gateway("gw1");
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    gateway.device.hardware_id = "hw-replacement".into();
    assert!(matches!(
        net.update_gateway(TEST_NETWORK, &gateway),
        Err(CoreError::Validation { .. })
    ));
}

#[test]
fn cellular_sub_config_read_modify_write() {
    let net = TestNetwork::seeded();
    let gateway = sample_gateway("gw1");
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    let ran = GatewayRanConfigs {
        pci: 7,
        transmit_enabled: false,
    };
    net.update_gateway_config(TEST_NETWORK, "gw1", ran.clone())
        .unwrap();

    let loaded: GatewayRanConfigs = net.load_gateway_config(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded, ran);
    let epc: GatewayEpcConfigs = net.load_gateway_config(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(epc, gateway.cellular.epc);

    let err = net
        .load_gateway_config::<GatewayNonEpsConfigs>(TEST_NETWORK, "gw1")
        .unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn tier_move_without_merging() {
    let net = TestNetwork::seeded_with(SyncConfig::new().merge_association_updates(false));
    net.create_gateway(TEST_NETWORK, &gateway_with_serials("gw1", &["S1"]))
        .unwrap();

    let mut gateway = gateway_with_serials("gw1", &["S2"]);
    gateway.tier = OTHER_TIER.into();
    let plan = net.plan_update_gateway(TEST_NETWORK, &gateway).unwrap();
    assert_eq!(
        plan_summary(&plan),
        vec![
            "update upgrade_tier:canary",
            "update upgrade_tier:default",
            "update cellular_gateway:gw1",
        ]
    );

    net.submit(TEST_NETWORK, plan).unwrap();
    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.tier, OTHER_TIER);
    assert_eq!(loaded.connected_enodeb_serials, serials(&["S2"]));
}

#[test]
fn tier_move_with_merging() {
    let net = TestNetwork::seeded();
    net.create_gateway(TEST_NETWORK, &sample_gateway("gw1")).unwrap();

    let mut gateway = sample_gateway("gw1");
    gateway.tier = OTHER_TIER.into();
    gateway.name = "renamed".into();
    let plan = net.plan_update_gateway(TEST_NETWORK, &gateway).unwrap();
    assert_eq!(
        plan_summary(&plan),
        vec![
            "update magmad_gateway:gw1",
            "update cellular_gateway:gw1",
            "update upgrade_tier:canary",
            "update upgrade_tier:default",
        ]
    );

    net.submit(TEST_NETWORK, plan).unwrap();
    let loaded = net.load_gateway(TEST_NETWORK, "gw1").unwrap();
    assert_eq!(loaded.tier, OTHER_TIER);
    assert_eq!(loaded.name, "renamed");

    let cellular = net
        .store()
        .load_entity(
            TEST_NETWORK,
            &EntityRef::new(entity_type::CELLULAR_GATEWAY, "gw1"),
            LoadCriteria::full(),
        )
        .unwrap();
    assert_eq!(cellular.name, "renamed");
}

#[test]
fn reapplying_a_gateway_writes_nothing() {
    let net = TestNetwork::seeded();
    let mut gateway = gateway_with_serials("gw1", &["S1"]);
    gateway.apn_resources = resources([("internet", "r1", 10)]);
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    let plan = net.plan_update_gateway(TEST_NETWORK, &gateway).unwrap();
    assert!(plan.is_empty(), "{:?}", plan_summary(&plan));

    let before = net.write_calls();
    net.update_gateway(TEST_NETWORK, &gateway).unwrap();
    assert_eq!(net.write_calls(), before);

    gateway.apn_resources = resources([("internet", "", 10)]);
    assert!(net.plan_update_gateway(TEST_NETWORK, &gateway).unwrap().is_empty());
}

#[test]
fn apn_in_use_by_gateway_cannot_be_deleted() {
    let net = TestNetwork::seeded();
    let mut gateway = sample_gateway("gw1");
    gateway.apn_resources = resources([("ims", "r1", 1)]);
    net.create_gateway(TEST_NETWORK, &gateway).unwrap();

    assert!(matches!(
        net.delete_apn(TEST_NETWORK, "ims"),
        Err(CoreError::Validation { .. })
    ));
    net.delete_gateway(TEST_NETWORK, "gw1").unwrap();
    net.delete_apn(TEST_NETWORK, "ims").unwrap();
}

#[test]
fn store_outage_is_reported_as_unavailable() {
    let net = TestNetwork::seeded();
    net.store().set_unavailable(true);
    let err = net.load_gateway(TEST_NETWORK, "gw1").unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unavailable, "{err:?}");
}
