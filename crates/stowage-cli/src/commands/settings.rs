//! Storage backend settings commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use stowage_core::config::AppConfig;
use stowage_core::error::AppError;
use stowage_core::types::settings::{ObjectStoreSettings, StorageMode, StorageSettings};
use stowage_database::repositories::StorageSettingsRepository;

use crate::output::{self, OutputFormat};

/// Arguments for settings commands
#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Settings subcommand
    #[command(subcommand)]
    pub command: SettingsCommand,
}

/// Settings subcommands
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the persisted storage settings
    Show,
    /// Change the storage mode; omitted credentials keep their stored values
    SetMode {
        /// `local` or `object`
        mode: String,
        /// Object store endpoint URL (empty for AWS)
        #[arg(long)]
        endpoint: Option<String>,
        /// Object store region
        #[arg(long)]
        region: Option<String>,
        /// Bucket name
        #[arg(long)]
        bucket: Option<String>,
        /// Access key ID
        #[arg(long)]
        access_key: Option<String>,
        /// Secret access key
        #[arg(long)]
        secret_key: Option<String>,
    },
}

/// Settings as displayed, with the secret masked.
#[derive(Debug, Serialize)]
struct SettingsView {
    mode: StorageMode,
    endpoint: String,
    region: String,
    bucket: String,
    access_key: String,
    secret_key: &'static str,
    object_complete: bool,
    version: i64,
}

impl From<&StorageSettings> for SettingsView {
    fn from(settings: &StorageSettings) -> Self {
        Self {
            mode: settings.mode,
            endpoint: settings.object.endpoint.clone(),
            region: settings.object.region.clone(),
            bucket: settings.object.bucket.clone(),
            access_key: settings.object.access_key.clone(),
            secret_key: if settings.object.secret_key.is_empty() { "" } else { "***" },
            object_complete: settings.object.is_complete(),
            version: settings.version,
        }
    }
}

fn print_settings(settings: &StorageSettings, format: OutputFormat) {
    let view = SettingsView::from(settings);
    let rows = [
        ("Mode", view.mode.to_string()),
        ("Endpoint", view.endpoint.clone()),
        ("Region", view.region.clone()),
        ("Bucket", view.bucket.clone()),
        ("Access key", view.access_key.clone()),
        ("Secret key", view.secret_key.to_string()),
        ("Object store complete", view.object_complete.to_string()),
        ("Version", view.version.to_string()),
    ];
    output::print_item(&view, &rows, format);
}

/// Execute settings commands.
pub async fn execute(args: &SettingsArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let pool = super::connect(config).await?;
    let repo = StorageSettingsRepository::new(pool.clone());

    match &args.command {
        SettingsCommand::Show => {
            let settings = repo
                .bootstrap(config.storage.bootstrap.mode, &config.storage.bootstrap.object)
                .await?;
            print_settings(&settings, format);
        }
        SettingsCommand::SetMode {
            mode,
            endpoint,
            region,
            bucket,
            access_key,
            secret_key,
        } => {
            let mode: StorageMode = mode.parse()?;
            let current = repo.load().await?.unwrap_or_default().object;
            let object = ObjectStoreSettings {
                endpoint: endpoint.clone().unwrap_or(current.endpoint),
                region: region.clone().unwrap_or(current.region),
                bucket: bucket.clone().unwrap_or(current.bucket),
                access_key: access_key.clone().unwrap_or(current.access_key),
                secret_key: secret_key.clone().unwrap_or(current.secret_key),
            };
            let settings = repo.save(mode, &object).await?;
            if mode == StorageMode::Object && !object.is_complete() {
                output::print_warning(
                    "Object store credentials are incomplete; writes will fall back to local storage",
                );
            }
            print_settings(&settings, format);
            output::print_success(&format!("Storage mode set to '{mode}'"));
        }
    }

    pool.close().await;
    Ok(())
}
