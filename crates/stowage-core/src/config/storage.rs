//! Storage provider configuration.

use serde::{Deserialize, Serialize};

use crate::types::settings::ObjectStoreSettings;
use crate::types::settings::StorageMode;

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// Timeout applied to every backend call, in seconds.
    #[serde(default = "default_io_timeout")]
    pub io_timeout_seconds: u64,
    /// Maximum attempts (including the first) for object store requests.
    #[serde(default = "default_max_attempts")]
    pub object_max_attempts: u32,
    /// Lifetime of presigned download URLs, in seconds.
    #[serde(default = "default_presigned_ttl")]
    pub presigned_url_ttl_seconds: u64,
    /// Settings written to the database when no settings row exists yet.
    #[serde(default)]
    pub bootstrap: BootstrapStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local: LocalStorageConfig::default(),
            io_timeout_seconds: default_io_timeout(),
            object_max_attempts: default_max_attempts(),
            presigned_url_ttl_seconds: default_presigned_ttl(),
            bootstrap: BootstrapStorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local file storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
    /// Public base URL under which the local root is served.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
            base_url: default_base_url(),
        }
    }
}

/// Initial backend selection for a fresh installation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapStorageConfig {
    /// Desired storage mode.
    #[serde(default)]
    pub mode: StorageMode,
    /// Object store credentials.
    #[serde(default)]
    pub object: ObjectStoreSettings,
}

fn default_io_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_presigned_ttl() -> u64 {
    3600
}

fn default_local_root() -> String {
    "./data/storage".to_string()
}

fn default_base_url() -> String {
    "/media".to_string()
}
