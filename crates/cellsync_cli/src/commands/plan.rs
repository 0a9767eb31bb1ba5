//! Plan-gateway command implementation.

use super::fixture::{read_json, Fixture};
use super::{write_json, write_line, CommandResult, OutputFormat};
use cellsync_core::models::MutableLteGateway;
use cellsync_core::sync::WritePlan;
use cellsync_core::{Configurator, SyncConfig};
use cellsync_store::InMemoryStore;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Whether a gateway is new to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    /// The gateway does not exist yet.
    Create,
    /// The gateway exists and is replaced.
    Update,
}

/// A plan plus the mode it was computed in.
#[derive(Debug, Serialize)]
pub struct GatewayPlan {
    /// Gateway ID.
    pub gateway: String,
    /// Create or update.
    pub mode: PlanMode,
    /// Operations in submission order.
    pub plan: WritePlan,
}

/// Plans `gateway` as a create if its magmad entity is absent, otherwise as
/// an update.
///
/// # Errors
///
/// Returns the planner's error.
pub fn plan_for(
    configurator: &Configurator<InMemoryStore>,
    network_id: &str,
    gateway: &MutableLteGateway,
) -> CommandResult<GatewayPlan> {
    let exists = configurator
        .store()
        .contains(network_id, &gateway.magmad_ref());
    let (mode, plan) = if exists {
        (PlanMode::Update, configurator.plan_update_gateway(network_id, gateway)?)
    } else {
        (PlanMode::Create, configurator.plan_create_gateway(network_id, gateway)?)
    };
    Ok(GatewayPlan {
        gateway: gateway.id.clone(),
        mode,
        plan,
    })
}

/// Runs the plan-gateway command.
pub fn run(
    fixture: &Path,
    gateway: &Path,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CommandResult<()> {
    let fixture = Fixture::load(fixture)?;
    let configurator = fixture.seed(SyncConfig::default())?;
    let gateway: MutableLteGateway = read_json(gateway)?;

    let result = plan_for(&configurator, &fixture.network.id, &gateway)?;
    match format {
        OutputFormat::Json => write_json(out, &result),
        OutputFormat::Text => print_text_output(out, &result),
    }
}

fn print_text_output(out: &mut dyn Write, result: &GatewayPlan) -> CommandResult<()> {
    let plan = &result.plan;
    write_line(
        out,
        format_args!(
            "Gateway {} ({:?}): {} operations ({} creates, {} updates, {} deletes)",
            result.gateway,
            result.mode,
            plan.len(),
            plan.create_count(),
            plan.update_count(),
            plan.delete_count()
        ),
    )?;
    for (i, op) in plan.operations().iter().enumerate() {
        write_line(out, format_args!("  {:>3}. {op}", i + 1))?;
    }
    Ok(())
}
