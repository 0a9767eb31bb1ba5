//! Apply-gateway command implementation.

use super::fixture::{read_json, Fixture};
use super::plan::plan_for;
use super::show::print_gateway;
use super::{write_json, CommandResult, OutputFormat};
use cellsync_core::models::MutableLteGateway;
use cellsync_core::SyncConfig;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Runs the apply-gateway command: plans, submits, and prints the gateway
/// as read back from the store.
pub fn run(
    fixture: &Path,
    gateway: &Path,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CommandResult<()> {
    let fixture = Fixture::load(fixture)?;
    let network_id = fixture.network.id.as_str();
    let configurator = fixture.seed(SyncConfig::default())?;
    let gateway: MutableLteGateway = read_json(gateway)?;

    let planned = plan_for(&configurator, network_id, &gateway)?;
    info!(
        gateway = %planned.gateway,
        mode = ?planned.mode,
        operations = planned.plan.len(),
        "applying gateway"
    );
    configurator.submit(network_id, planned.plan)?;

    let stored = configurator.load_gateway(network_id, &gateway.id)?;
    match format {
        OutputFormat::Json => write_json(out, &stored),
        OutputFormat::Text => print_gateway(out, &stored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::tests::{write_temp, FIXTURE};
    use crate::commands::CommandError;
    use cellsync_core::CoreError;

    #[test]
    fn applied_gateway_is_read_back() {
        let fixture = write_temp(FIXTURE);
        let gateway = write_temp(
            r#"{
                "id": "gw2", "name": "gateway two", "description": "",
                "device": {"hardware_id": "hw-2"},
                "magmad": {"checkin_interval": 60, "checkin_timeout": 30,
                    "autoupgrade_enabled": false, "autoupgrade_poll_interval": 300,
                    "dynamic_services": [], "feature_flags": {}},
                "tier": "default",
                "cellular": {
                    "epc": {"ip_block": "10.0.0.0/24", "nat_enabled": false},
                    "ran": {"pci": 1, "transmit_enabled": false}
                },
                "connected_enodeb_serials": ["S2"]
            }"#,
        );
        let mut out = Vec::new();
        run(fixture.path(), gateway.path(), OutputFormat::Json, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["id"], "gw2");
        assert_eq!(value["connected_enodeb_serials"], serde_json::json!(["S2"]));
        assert_eq!(value["tier"], "default");
    }

    #[test]
    fn conflicting_enodeb_is_rejected() {
        let fixture = write_temp(FIXTURE);
        let gateway = write_temp(
            r#"{
                "id": "gw2", "name": "", "description": "",
                "device": {"hardware_id": "hw-2"},
                "magmad": {"checkin_interval": 60, "checkin_timeout": 30,
                    "autoupgrade_enabled": false, "autoupgrade_poll_interval": 300,
                    "dynamic_services": [], "feature_flags": {}},
                "tier": "default",
                "cellular": {
                    "epc": {"ip_block": "10.0.0.0/24", "nat_enabled": false},
                    "ran": {"pci": 1, "transmit_enabled": false}
                },
                "connected_enodeb_serials": ["S1"]
            }"#,
        );
        let err = run(fixture.path(), gateway.path(), OutputFormat::Text, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CommandError::Core(CoreError::Validation { .. })), "{err}");
    }
}
