//! Persisted storage backend settings.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_core::traits::settings::SettingsSource;
use stowage_core::types::settings::{ObjectStoreSettings, StorageMode, StorageSettings};

#[derive(Debug, FromRow)]
struct SettingsRow {
    storage_mode: String,
    endpoint: String,
    region: String,
    bucket: String,
    access_key: String,
    secret_key: String,
    version: i64,
}

impl SettingsRow {
    fn into_settings(self) -> AppResult<StorageSettings> {
        Ok(StorageSettings {
            mode: self.storage_mode.parse()?,
            object: ObjectStoreSettings {
                endpoint: self.endpoint,
                region: self.region,
                bucket: self.bucket,
                access_key: self.access_key,
                secret_key: self.secret_key,
            },
            version: self.version,
        })
    }
}

/// Repository for the single-row storage settings table.
#[derive(Debug, Clone)]
pub struct StorageSettingsRepository {
    pool: SqlitePool,
}

impl StorageSettingsRepository {
    /// Create a new settings repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the stored settings, if any were ever saved.
    pub async fn load(&self) -> AppResult<Option<StorageSettings>> {
        sqlx::query_as::<_, SettingsRow>("SELECT * FROM storage_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load storage settings", e))?
            .map(SettingsRow::into_settings)
            .transpose()
    }

    /// Save new settings, bumping the version.
    pub async fn save(&self, mode: StorageMode, object: &ObjectStoreSettings) -> AppResult<StorageSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "INSERT INTO storage_settings (id, storage_mode, endpoint, region, bucket, access_key, secret_key, version, updated_at) \
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, 1, ?7) \
             ON CONFLICT(id) DO UPDATE SET \
                storage_mode = excluded.storage_mode, endpoint = excluded.endpoint, \
                region = excluded.region, bucket = excluded.bucket, \
                access_key = excluded.access_key, secret_key = excluded.secret_key, \
                version = storage_settings.version + 1, updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(mode.as_str())
        .bind(&object.endpoint)
        .bind(&object.region)
        .bind(&object.bucket)
        .bind(&object.access_key)
        .bind(&object.secret_key)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save storage settings", e))?;

        let settings = row.into_settings()?;
        info!(
            mode = %settings.mode,
            object_complete = settings.object.is_complete(),
            version = settings.version,
            "Storage settings saved"
        );
        Ok(settings)
    }

    /// Write `mode`/`object` only if no settings row exists yet.
    ///
    /// Returns the settings in effect afterwards.
    pub async fn bootstrap(&self, mode: StorageMode, object: &ObjectStoreSettings) -> AppResult<StorageSettings> {
        match self.load().await? {
            Some(existing) => Ok(existing),
            None => self.save(mode, object).await,
        }
    }
}

#[async_trait]
impl SettingsSource for StorageSettingsRepository {
    async fn current(&self) -> AppResult<StorageSettings> {
        Ok(self.load().await?.unwrap_or_default())
    }
}
