//! The closed set of concrete storage backends.

use std::sync::Arc;

use stowage_core::result::AppResult;
use stowage_core::traits::storage::StorageProvider;
use stowage_core::types::settings::{ObjectStoreSettings, StorageMode};

use crate::providers::{LocalStorageProvider, S3ProviderOptions, S3StorageProvider};

/// A concrete backend selected for one operation.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Local filesystem.
    Local(Arc<LocalStorageProvider>),
    /// Object store client built from the admin credentials.
    Object(Arc<dyn StorageProvider>),
}

impl Backend {
    /// Which mode this backend serves.
    pub fn kind(&self) -> StorageMode {
        match self {
            Self::Local(_) => StorageMode::Local,
            Self::Object(_) => StorageMode::Object,
        }
    }

    /// The provider behind this backend.
    pub fn provider(&self) -> &dyn StorageProvider {
        match self {
            Self::Local(p) => p.as_ref(),
            Self::Object(p) => p.as_ref(),
        }
    }
}

/// Builds object store clients from credentials.
pub trait ObjectConnector: Send + Sync + std::fmt::Debug {
    /// Build a client for the given credentials.
    fn connect(&self, settings: &ObjectStoreSettings) -> AppResult<Arc<dyn StorageProvider>>;
}

/// Connects to S3-compatible stores with the AWS SDK.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector {
    /// Client tuning applied to every connection.
    pub options: S3ProviderOptions,
}

impl ObjectConnector for S3Connector {
    fn connect(&self, settings: &ObjectStoreSettings) -> AppResult<Arc<dyn StorageProvider>> {
        Ok(Arc::new(S3StorageProvider::new(settings, self.options)?))
    }
}
