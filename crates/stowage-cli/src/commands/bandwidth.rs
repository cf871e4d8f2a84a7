//! Bandwidth metering commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use stowage_core::config::AppConfig;
use stowage_core::error::AppError;

use crate::output::{self, OutputFormat, format_bytes};

/// Arguments for bandwidth commands
#[derive(Debug, Args)]
pub struct BandwidthArgs {
    /// Bandwidth subcommand
    #[command(subcommand)]
    pub command: BandwidthCommand,
}

/// Bandwidth subcommands
#[derive(Debug, Subcommand)]
pub enum BandwidthCommand {
    /// Show the current cycle and past cycles for an organization
    Show {
        /// Organization ID
        #[arg(long)]
        org: String,
    },
}

/// Cycle history row
#[derive(Debug, Serialize, Tabled)]
struct CycleRow {
    /// First day of the cycle
    cycle_start: String,
    /// Bytes served
    used: String,
}

/// Execute bandwidth commands.
pub async fn execute(args: &BandwidthArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let engine = super::engine(config).await?;

    match &args.command {
        BandwidthCommand::Show { org } => {
            let org = super::parse_org(org)?;
            let snapshot = engine.bandwidth.snapshot(org).await?;
            let limit = if snapshot.is_limited {
                format_bytes(snapshot.limit_bytes)
            } else {
                "unlimited".to_string()
            };
            let rows = [
                ("Cycle start", snapshot.cycle_start.to_string()),
                ("Used", format_bytes(snapshot.used_bytes)),
                ("Limit", limit),
            ];
            output::print_item(&snapshot, &rows, format);

            let history: Vec<CycleRow> = engine
                .bandwidth_repo
                .history(org)
                .await?
                .into_iter()
                .map(|row| CycleRow {
                    cycle_start: row.cycle_start.to_string(),
                    used: format_bytes(row.used()),
                })
                .collect();
            if format == OutputFormat::Table {
                println!();
            }
            output::print_list(&history, format);
        }
    }

    engine.pool.close().await;
    Ok(())
}
