//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod bandwidth;
pub mod database;
pub mod logging;
pub mod rate_limit;
pub mod storage;
pub mod upload;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::bandwidth::BandwidthConfig;
use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::rate_limit::RateLimitConfig;
use self::storage::StorageConfig;
use self::upload::UploadConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload validation settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Upload throttling settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Bandwidth cycle settings.
    #[serde(default)]
    pub bandwidth: BandwidthConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `STOWAGE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STOWAGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = AppConfig::default();
        assert!(config.database.url.starts_with("sqlite:"));
        assert!(config.upload.max_upload_size_bytes > 0);
        assert!(config.upload.blocked_extensions.iter().any(|e| e == "exe"));
        assert_eq!(config.bandwidth.monthly_cycle_days, 30);
        assert_eq!(config.bandwidth.yearly_cycle_days, 365);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[storage]\nio_timeout_seconds = 3\n[rate_limit]\nenabled = false\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();
        assert_eq!(config.storage.io_timeout_seconds, 3);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.storage.object_max_attempts, 3);
        assert_eq!(config.logging.level, "info");
    }
}
