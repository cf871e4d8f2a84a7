//! Runtime backend selection with fallback to local storage.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use stowage_core::config::storage::StorageConfig;
use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_core::traits::settings::SettingsSource;
use stowage_core::traits::storage::{ByteStream, StorageProvider};
use stowage_core::types::settings::{StorageMode, StorageSettings};

use crate::backend::{Backend, ObjectConnector, S3Connector};
use crate::providers::{LocalStorageProvider, S3ProviderOptions};

/// Tuning for [`DynamicStorage`].
#[derive(Debug, Clone, Copy)]
pub struct DynamicStorageOptions {
    /// Upper bound on every backend call.
    pub io_timeout: Duration,
    /// Object client options.
    pub object: S3ProviderOptions,
}

impl DynamicStorageOptions {
    /// Options taken from the storage configuration section.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            io_timeout: Duration::from_secs(config.io_timeout_seconds.max(1)),
            object: S3ProviderOptions {
                max_attempts: config.object_max_attempts.max(1),
                presigned_ttl: Duration::from_secs(config.presigned_url_ttl_seconds),
            },
        }
    }
}

impl Default for DynamicStorageOptions {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(30),
            object: S3ProviderOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedBackend {
    version: i64,
    backend: Backend,
}

/// Facade that delegates each call to the backend the current settings ask for.
///
/// The selected backend is cached and revalidated against the settings
/// version at the start of every call. Object mode with incomplete
/// credentials silently uses local storage. When an object call fails, the
/// settings are read again: if the operator has since moved away from
/// object mode, the call is retried once on local storage; otherwise the
/// failure propagates as `StorageUnavailable`.
///
/// Files already stored are reached through [`DynamicStorage::open_from`]
/// and [`DynamicStorage::delete_from`], which go to the backend recorded at
/// upload time whatever the current mode is.
pub struct DynamicStorage {
    settings: Arc<dyn SettingsSource>,
    local: Arc<LocalStorageProvider>,
    connector: Arc<dyn ObjectConnector>,
    options: DynamicStorageOptions,
    cached: Mutex<Option<CachedBackend>>,
}

impl std::fmt::Debug for DynamicStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicStorage")
            .field("local", &self.local)
            .field("connector", &self.connector)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Whether a failed call on `selected` should be retried on local storage,
/// given the mode the settings ask for after the failure.
pub fn should_fall_back(selected: StorageMode, desired: StorageMode) -> bool {
    selected == StorageMode::Object && desired != StorageMode::Object
}

/// Which backend kind the given settings resolve to.
pub fn effective_mode(settings: &StorageSettings) -> StorageMode {
    match settings.mode {
        StorageMode::Object if settings.object.is_complete() => StorageMode::Object,
        _ => StorageMode::Local,
    }
}

impl DynamicStorage {
    /// Create a selector over the given settings source and local provider.
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        local: Arc<LocalStorageProvider>,
        options: DynamicStorageOptions,
    ) -> Self {
        Self {
            settings,
            local,
            connector: Arc::new(S3Connector {
                options: options.object,
            }),
            options,
            cached: Mutex::new(None),
        }
    }

    /// Replace the client factory used for object mode.
    pub fn with_connector(mut self, connector: Arc<dyn ObjectConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// The backend the current settings select.
    pub async fn current_backend(&self) -> AppResult<Backend> {
        let settings = self.settings.current().await?;
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref().filter(|c| c.version == settings.version) {
            return Ok(entry.backend.clone());
        }

        let backend = self.build_backend(&settings)?;
        debug!(
            version = settings.version,
            backend = %backend.kind(),
            "Storage backend selected"
        );
        *cached = Some(CachedBackend {
            version: settings.version,
            backend: backend.clone(),
        });
        Ok(backend)
    }

    fn build_backend(&self, settings: &StorageSettings) -> AppResult<Backend> {
        match (settings.mode, effective_mode(settings)) {
            (StorageMode::Object, StorageMode::Object) => {
                Ok(Backend::Object(self.connector.connect(&settings.object)?))
            }
            (StorageMode::Object, _) => {
                warn!(
                    version = settings.version,
                    "Object storage selected but credentials are incomplete; using local storage"
                );
                Ok(Backend::Local(self.local.clone()))
            }
            _ => Ok(Backend::Local(self.local.clone())),
        }
    }

    /// The backend that holds bytes written while `held_by` was selected.
    async fn backend_holding(&self, held_by: StorageMode) -> AppResult<Backend> {
        if held_by == StorageMode::Local {
            return Ok(Backend::Local(self.local.clone()));
        }
        let current = self.current_backend().await?;
        if current.kind() == StorageMode::Object {
            return Ok(current);
        }
        let settings = self.settings.current().await?;
        if !settings.object.is_complete() {
            return Err(AppError::storage_unavailable(
                "File is held on object storage but its credentials are not configured",
            ));
        }
        Ok(Backend::Object(self.connector.connect(&settings.object)?))
    }

    async fn timed<T, Fut>(&self, op: &'static str, key: &str, fut: Fut) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout(self.options.io_timeout, fut)
            .await
            .map_err(|_| {
                AppError::storage_unavailable(format!(
                    "Storage {op} of {key} timed out after {}s",
                    self.options.io_timeout.as_secs_f32()
                ))
            })?
    }

    /// Run `call` on the selected backend, applying the timeout and fallback policy.
    async fn run<T, F, Fut>(&self, op: &'static str, key: &str, call: F) -> AppResult<T>
    where
        F: Fn(Backend) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let backend = self.current_backend().await?;
        let selected = backend.kind();
        let err = match self.timed(op, key, call(backend)).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if selected != StorageMode::Object {
            return Err(err);
        }

        // Objects written while object mode was unusable live on local storage.
        if err.kind == ErrorKind::NotFound {
            return match self.timed(op, key, call(Backend::Local(self.local.clone()))).await {
                Err(local_err) if local_err.kind == ErrorKind::NotFound => Err(err),
                other => other,
            };
        }

        let desired = self.settings.current().await?.mode;
        if should_fall_back(selected, desired) {
            warn!(
                op,
                key,
                desired = %desired,
                error = %err,
                "Object storage call failed after a mode change; retrying on local storage"
            );
            return self.timed(op, key, call(Backend::Local(self.local.clone()))).await;
        }

        Err(match err.kind {
            ErrorKind::StorageUnavailable => err,
            _ => AppError::storage_unavailable(format!("Storage {op} of {key} failed: {}", err.message)),
        })
    }

    /// Open an object as a byte stream.
    pub async fn open(&self, key: &str) -> AppResult<ByteStream> {
        self.run("open", key, |b| {
            let key = key.to_string();
            async move { b.provider().read(&key).await }
        })
        .await
    }

    /// Open an object on the backend that holds it.
    pub async fn open_from(&self, held_by: StorageMode, key: &str) -> AppResult<ByteStream> {
        let backend = self.backend_holding(held_by).await?;
        self.timed("open", key, backend.provider().read(key))
            .await
            .map_err(|err| unavailable_unless_missing("open", key, held_by, err))
    }

    /// Durably write bytes under `key`. Returns the backend kind that holds them.
    pub async fn save(&self, key: &str, data: Bytes) -> AppResult<StorageMode> {
        self.run("save", key, |b| {
            let key = key.to_string();
            let data = data.clone();
            async move {
                b.provider().write(&key, data).await?;
                Ok(b.kind())
            }
        })
        .await
    }

    /// Delete the object under `key`, including any copy left on local storage.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let selected = self
            .run("delete", key, |b| {
                let key = key.to_string();
                async move {
                    b.provider().delete(&key).await?;
                    Ok(b.kind())
                }
            })
            .await?;
        if selected == StorageMode::Object {
            self.timed("delete", key, self.local.delete(key)).await?;
        }
        Ok(())
    }

    /// Delete an object from the backend that holds it.
    pub async fn delete_from(&self, held_by: StorageMode, key: &str) -> AppResult<()> {
        let backend = self.backend_holding(held_by).await?;
        self.timed("delete", key, backend.provider().delete(key))
            .await
            .map_err(|err| unavailable_unless_missing("delete", key, held_by, err))
    }

    /// Whether an object exists on the selected backend or on local storage.
    pub async fn exists(&self, key: &str) -> AppResult<bool> {
        let found = self
            .run("exists", key, |b| {
                let key = key.to_string();
                async move { b.provider().exists(&key).await }
            })
            .await?;
        if found || self.current_backend().await?.kind() == StorageMode::Local {
            return Ok(found);
        }
        self.timed("exists", key, self.local.exists(key)).await
    }

    /// Size of a stored object in bytes.
    pub async fn size(&self, key: &str) -> AppResult<u64> {
        self.run("size", key, |b| {
            let key = key.to_string();
            async move { b.provider().size(&key).await }
        })
        .await
    }

    /// A URL from which the object can be fetched.
    pub async fn url(&self, key: &str) -> AppResult<String> {
        self.run("url", key, |b| {
            let key = key.to_string();
            async move { b.provider().url(&key).await }
        })
        .await
    }
}

fn unavailable_unless_missing(op: &str, key: &str, held_by: StorageMode, err: AppError) -> AppError {
    match err.kind {
        ErrorKind::NotFound | ErrorKind::StorageUnavailable => err,
        _ if held_by == StorageMode::Local => err,
        _ => AppError::storage_unavailable(format!("Storage {op} of {key} failed: {}", err.message)),
    }
}
