//! In-memory storage settings.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use stowage_core::result::AppResult;
use stowage_core::traits::settings::SettingsSource;
use stowage_core::types::settings::{ObjectStoreSettings, StorageMode, StorageSettings};

/// A [`SettingsSource`] held in memory.
///
/// Used for static deployments and tests. Each [`update`](Self::update)
/// bumps the version so selectors rebuild their cached backend.
#[derive(Debug, Default)]
pub struct SettingsHandle {
    inner: RwLock<StorageSettings>,
}

impl SettingsHandle {
    /// Create a handle with the given initial mode and credentials.
    pub fn new(mode: StorageMode, object: ObjectStoreSettings) -> Self {
        Self {
            inner: RwLock::new(StorageSettings {
                mode,
                object,
                version: 1,
            }),
        }
    }

    /// Replace the settings and bump the version.
    pub async fn update(&self, mode: StorageMode, object: ObjectStoreSettings) -> StorageSettings {
        let mut guard = self.inner.write().await;
        guard.mode = mode;
        guard.object = object;
        guard.version += 1;
        info!(mode = %guard.mode, version = guard.version, "Storage settings updated");
        guard.clone()
    }
}

#[async_trait]
impl SettingsSource for SettingsHandle {
    async fn current(&self) -> AppResult<StorageSettings> {
        Ok(self.inner.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_bumps_version() {
        let handle = SettingsHandle::new(StorageMode::Local, ObjectStoreSettings::default());
        let before = handle.current().await.unwrap();
        let after = handle
            .update(StorageMode::Object, ObjectStoreSettings::default())
            .await;
        assert_eq!(after.version, before.version + 1);
        assert_eq!(handle.current().await.unwrap().mode, StorageMode::Object);
    }
}
