//! CLI command definitions and dispatch.

pub mod bandwidth;
pub mod migrate;
pub mod settings;
pub mod usage;

use clap::{Parser, Subcommand};
use sqlx::SqlitePool;

use stowage_core::config::AppConfig;
use stowage_core::error::AppError;
use stowage_database::DatabasePool;
use stowage_database::migration::run_migrations;
use stowage_database::repositories::StorageSettingsRepository;
use stowage_service::Engine;

use crate::output::OutputFormat;

/// Stowage: storage quotas, usage accounting and folder trees
#[derive(Debug, Parser)]
#[command(name = "stowage-cli", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment overlay (`config/<env>.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Storage usage counters
    Usage(usage::UsageArgs),
    /// Bandwidth metering
    Bandwidth(bandwidth::BandwidthArgs),
    /// Storage backend settings
    Settings(settings::SettingsArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => migrate::execute(config).await,
            Commands::Usage(args) => usage::execute(args, config, self.format).await,
            Commands::Bandwidth(args) => bandwidth::execute(args, config, self.format).await,
            Commands::Settings(args) => settings::execute(args, config, self.format).await,
        }
    }
}

/// Connect and bring the schema up to date.
pub async fn connect(config: &AppConfig) -> Result<SqlitePool, AppError> {
    let pool = DatabasePool::connect(&config.database).await?.into_pool();
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Connect, seed bootstrap storage settings, and wire the full engine.
pub async fn engine(config: &AppConfig) -> Result<Engine, AppError> {
    let pool = connect(config).await?;
    StorageSettingsRepository::new(pool.clone())
        .bootstrap(config.storage.bootstrap.mode, &config.storage.bootstrap.object)
        .await?;
    let storage = Engine::storage_from_config(&pool, config).await?;
    Ok(Engine::build(pool, config, storage))
}

/// Parse an organization ID argument.
pub fn parse_org(raw: &str) -> Result<uuid::Uuid, AppError> {
    uuid::Uuid::parse_str(raw.trim())
        .map_err(|e| AppError::validation(format!("Invalid organization ID '{raw}': {e}")))
}
