//! Source of the current storage settings.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::settings::StorageSettings;

/// Supplies the current, versioned storage settings.
///
/// Implemented by the database settings repository and by the in-memory
/// handle in `stowage-storage`. Consumers call [`current`](Self::current)
/// at the start of every backend operation so that changes take effect
/// without a restart.
#[async_trait]
pub trait SettingsSource: Send + Sync + 'static {
    /// Return the current settings snapshot.
    async fn current(&self) -> AppResult<StorageSettings>;
}
