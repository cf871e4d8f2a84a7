//! Admin-configurable storage backend settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which backend the operator wants file bytes to live on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Local filesystem.
    #[default]
    Local,
    /// S3-compatible object storage.
    Object,
}

impl StorageMode {
    /// Stable lowercase name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "object" | "s3" => Ok(Self::Object),
            other => Err(AppError::validation(format!("Unknown storage mode '{other}'"))),
        }
    }
}

impl TryFrom<String> for StorageMode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Credentials and location of the S3-compatible object store.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    /// Custom endpoint URL (empty for AWS).
    #[serde(default)]
    pub endpoint: String,
    /// Region name.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key id.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
}

impl ObjectStoreSettings {
    /// Whether enough is configured to talk to the object store.
    pub fn is_complete(&self) -> bool {
        !self.bucket.trim().is_empty()
            && !self.access_key.trim().is_empty()
            && !self.secret_key.trim().is_empty()
    }
}

impl fmt::Debug for ObjectStoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreSettings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// A versioned snapshot of the storage settings.
///
/// `version` increases on every change so consumers can cheaply detect
/// that a cached backend is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Desired storage mode.
    pub mode: StorageMode,
    /// Object store credentials.
    pub object: ObjectStoreSettings,
    /// Monotonic change counter.
    pub version: i64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}
