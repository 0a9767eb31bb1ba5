//! Show commands.

use super::fixture::Fixture;
use super::{write_json, write_line, CommandResult, OutputFormat};
use cellsync_core::models::{LteGateway, LteNetwork};
use cellsync_core::{AnyConfig, SyncConfig};
use cellsync_store::EntityRef;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// A network with the number of entities it owns.
#[derive(Debug, Serialize)]
pub struct NetworkSummary {
    /// The network.
    pub network: LteNetwork,
    /// Number of APNs.
    pub apn_count: usize,
    /// Number of eNodeBs.
    pub enodeb_count: usize,
    /// Number of stored entities of any type.
    pub entity_count: usize,
}

/// Runs the show-gateway command.
pub fn gateway(
    fixture: &Path,
    gateway_id: &str,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CommandResult<()> {
    let fixture = Fixture::load(fixture)?;
    let configurator = fixture.seed(SyncConfig::default())?;
    let gateway = configurator.load_gateway(&fixture.network.id, gateway_id)?;
    match format {
        OutputFormat::Json => write_json(out, &gateway),
        OutputFormat::Text => print_gateway(out, &gateway),
    }
}

/// Runs the show-network command.
pub fn network(fixture: &Path, format: OutputFormat, out: &mut dyn Write) -> CommandResult<()> {
    let fixture = Fixture::load(fixture)?;
    let network_id = fixture.network.id.as_str();
    let configurator = fixture.seed(SyncConfig::default())?;

    let summary = NetworkSummary {
        network: configurator.load_network(network_id)?,
        apn_count: configurator.list_apns(network_id)?.len(),
        enodeb_count: configurator.list_enodebs(network_id)?.len(),
        entity_count: configurator.store().entity_count(network_id),
    };
    match format {
        OutputFormat::Json => write_json(out, &summary),
        OutputFormat::Text => print_network(out, &summary),
    }
}

/// A stored entity's config, decoded by its kind tag.
#[derive(Debug, Serialize)]
pub struct EntityConfig {
    /// The entity.
    pub entity: EntityRef,
    /// Its decoded config, if any.
    pub config: Option<AnyConfig>,
}

/// Runs the show-entity command.
pub fn entity(
    fixture: &Path,
    entity_type: &str,
    key: &str,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CommandResult<()> {
    let fixture = Fixture::load(fixture)?;
    let configurator = fixture.seed(SyncConfig::default())?;
    let entity = EntityRef::new(entity_type, key);
    let config = configurator.load_entity_config(&fixture.network.id, &entity)?;
    let shown = EntityConfig { entity, config };
    match format {
        OutputFormat::Json => write_json(out, &shown),
        OutputFormat::Text => {
            write_line(out, format_args!("Entity {}", shown.entity))?;
            match &shown.config {
                Some(config) => write_json(out, config),
                None => write_line(out, "  (no config)"),
            }
        }
    }
}

pub(crate) fn print_gateway(out: &mut dyn Write, gateway: &LteGateway) -> CommandResult<()> {
    write_line(out, format_args!("Gateway {}", gateway.id))?;
    write_line(out, format_args!("  Name:        {}", gateway.name))?;
    if let Some(device) = &gateway.device {
        write_line(out, format_args!("  Hardware ID: {}", device.hardware_id))?;
    }
    write_line(out, format_args!("  Tier:        {}", gateway.tier))?;
    write_line(out, format_args!("  IP block:    {}", gateway.cellular.epc.ip_block))?;
    write_line(
        out,
        format_args!("  eNodeBs:     {}", gateway.connected_enodeb_serials.0.join(", ")),
    )?;
    write_line(out, "  APN resources:")?;
    for (apn, resource) in &gateway.apn_resources.0 {
        write_line(
            out,
            format_args!("    {apn}: id={} vlan={}", resource.id, resource.vlan_id),
        )?;
    }
    Ok(())
}

fn print_network(out: &mut dyn Write, summary: &NetworkSummary) -> CommandResult<()> {
    let network = &summary.network;
    let epc = &network.cellular.epc;
    write_line(out, format_args!("Network {} ({})", network.id, network.name))?;
    write_line(out, format_args!("  PLMN:     {}{}", epc.mcc, epc.mnc))?;
    write_line(out, format_args!("  TAC:      {}", epc.tac))?;
    write_line(out, format_args!("  APNs:     {}", summary.apn_count))?;
    write_line(out, format_args!("  eNodeBs:  {}", summary.enodeb_count))?;
    write_line(out, format_args!("  Entities: {}", summary.entity_count))
}
