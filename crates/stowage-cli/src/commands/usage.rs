//! Storage usage commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use stowage_core::config::AppConfig;
use stowage_core::error::AppError;
use stowage_entity::usage::UsageSnapshot;

use crate::output::{self, OutputFormat, format_bytes};

/// Arguments for usage commands
#[derive(Debug, Args)]
pub struct UsageArgs {
    /// Usage subcommand
    #[command(subcommand)]
    pub command: UsageCommand,
}

/// Usage subcommands
#[derive(Debug, Subcommand)]
pub enum UsageCommand {
    /// Show an organization's usage against its limit
    Show {
        /// Organization ID
        #[arg(long)]
        org: String,
    },
    /// Recompute cached usage from live files
    Rebuild {
        /// Organization ID
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        org: Option<String>,
        /// Rebuild every organization
        #[arg(long)]
        all: bool,
    },
}

/// One organization's usage.
#[derive(Debug, Serialize)]
struct UsageView {
    organization_id: String,
    access: String,
    storage: UsageSnapshot,
    plan_storage_gb: i64,
    addon_storage_gb: i64,
}

/// Rebuild report row
#[derive(Debug, Serialize, Tabled)]
struct RebuildRow {
    /// Organization ID
    organization: String,
    /// Counter before the rebuild
    previous: String,
    /// Counter after the rebuild
    rebuilt: String,
    /// Difference in bytes
    drift: i64,
}

/// Execute usage commands.
pub async fn execute(args: &UsageArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let engine = super::engine(config).await?;

    match &args.command {
        UsageCommand::Show { org } => {
            let org = super::parse_org(org)?;
            let state = engine.quota.resolve(org).await?;
            let used = engine.usage.get(org).await?.used();
            let view = UsageView {
                organization_id: org.to_string(),
                access: state.access.as_str().to_string(),
                storage: UsageSnapshot::new(used, state.limits.total_storage_bytes()),
                plan_storage_gb: state.limits.plan_storage_gb,
                addon_storage_gb: state.limits.addon_storage_gb,
            };
            let rows = [
                ("Organization", view.organization_id.clone()),
                ("Access", view.access.clone()),
                ("Used", format_bytes(view.storage.used_bytes)),
                ("Limit", format_bytes(view.storage.limit_bytes)),
                ("Available", format_bytes(view.storage.available_bytes)),
                ("Usage", format!("{:.1}%", view.storage.usage_percent)),
                ("Plan storage (GB)", view.plan_storage_gb.to_string()),
                ("Add-on storage (GB)", view.addon_storage_gb.to_string()),
            ];
            output::print_item(&view, &rows, format);
        }
        UsageCommand::Rebuild { org, all } => {
            let reports = match org {
                Some(org) => vec![engine.usage.rebuild_report(super::parse_org(org)?).await?],
                None => engine.usage.rebuild_all().await?,
            };
            let rows: Vec<RebuildRow> = reports
                .into_iter()
                .map(|r| RebuildRow {
                    organization: r.organization_id.to_string(),
                    previous: format_bytes(r.previous_bytes),
                    rebuilt: format_bytes(r.rebuilt_bytes),
                    drift: r.drift(),
                })
                .collect();
            output::print_list(&rows, format);
            if *all {
                output::print_success(&format!("{} organizations reconciled", rows.len()));
            }
        }
    }

    engine.pool.close().await;
    Ok(())
}
