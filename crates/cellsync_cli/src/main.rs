//! cellsync CLI
//!
//! Plans and applies LTE gateway configuration against an in-memory store
//! seeded from a JSON fixture.
//!
//! # Commands
//!
//! - `plan-gateway` - Print the write plan for a gateway without applying it
//! - `apply-gateway` - Apply a gateway and print the stored result
//! - `show-gateway` - Print a gateway as stored
//! - `show-network` - Print the network and its entity counts
//! - `show-entity` - Print any stored entity's decoded config

mod commands;

use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// cellsync command-line configuration tools.
#[derive(Parser)]
#[command(name = "cellsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON fixture seeding the store
    #[arg(global = true, short, long)]
    fixture: Option<PathBuf>,

    /// Output format
    #[arg(global = true, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the write plan for a gateway without applying it
    PlanGateway {
        /// Path to the gateway JSON
        gateway: PathBuf,
    },

    /// Apply a gateway (create or update) and print the stored result
    ApplyGateway {
        /// Path to the gateway JSON
        gateway: PathBuf,
    },

    /// Print a gateway as stored
    ShowGateway {
        /// Gateway ID
        id: String,
    },

    /// Print the network and its entity counts
    ShowNetwork,

    /// Print any stored entity's decoded config
    ShowEntity {
        /// Entity type, e.g. `apn_resource`
        entity_type: String,
        /// Entity key
        key: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::PlanGateway { gateway } => {
            let fixture = cli.fixture.ok_or("Fixture path required for plan-gateway")?;
            commands::plan::run(&fixture, &gateway, cli.format, &mut out)?;
        }
        Commands::ApplyGateway { gateway } => {
            let fixture = cli.fixture.ok_or("Fixture path required for apply-gateway")?;
            commands::apply::run(&fixture, &gateway, cli.format, &mut out)?;
        }
        Commands::ShowGateway { id } => {
            let fixture = cli.fixture.ok_or("Fixture path required for show-gateway")?;
            commands::show::gateway(&fixture, &id, cli.format, &mut out)?;
        }
        Commands::ShowNetwork => {
            let fixture = cli.fixture.ok_or("Fixture path required for show-network")?;
            commands::show::network(&fixture, cli.format, &mut out)?;
        }
        Commands::ShowEntity { entity_type, key } => {
            let fixture = cli.fixture.ok_or("Fixture path required for show-entity")?;
            commands::show::entity(&fixture, &entity_type, &key, cli.format, &mut out)?;
        }
        Commands::Version => {
            println!("cellsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
