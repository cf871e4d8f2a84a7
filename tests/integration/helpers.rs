//! Shared test helpers for integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use stowage_core::config::AppConfig;
use stowage_core::error::AppError;
use stowage_core::result::AppResult;
use stowage_core::traits::storage::{ByteStream, StorageProvider};
use stowage_core::types::settings::ObjectStoreSettings;
use stowage_database::DatabasePool;
use stowage_database::migration::run_migrations;
use stowage_database::repositories::{
    FolderRepository, OrganizationRepository, StorageSettingsRepository,
};
use stowage_entity::subscription::{BillingInterval, Subscription, SubscriptionStatus};
use stowage_entity::user::Role;
use stowage_service::{Engine, ExplorerContext, IncomingFile, Principal};
use stowage_storage::providers::LocalStorageProvider;
use stowage_storage::{DynamicStorage, DynamicStorageOptions, ObjectConnector};

/// A full engine over a temp database and a temp local storage root.
pub struct TestApp {
    /// Keeps the temp directory alive.
    _dir: TempDir,
    /// The wired services.
    pub engine: Engine,
    /// Application config.
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(adjust, None).await
    }

    /// Create a test application whose object mode talks to `store`.
    pub async fn with_object_store(adjust: impl FnOnce(&mut AppConfig), store: Arc<MemoryObjectStore>) -> Self {
        Self::build(adjust, Some(store)).await
    }

    async fn build(adjust: impl FnOnce(&mut AppConfig), store: Option<Arc<MemoryObjectStore>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("stowage.db").display());
        config.storage.local.root_path = dir.path().join("objects").display().to_string();
        config.rate_limit.enabled = false;
        adjust(&mut config);

        let pool = DatabasePool::connect(&config.database).await.unwrap().into_pool();
        run_migrations(&pool).await.unwrap();
        StorageSettingsRepository::new(pool.clone())
            .bootstrap(config.storage.bootstrap.mode, &config.storage.bootstrap.object)
            .await
            .unwrap();
        let storage = match store {
            None => Engine::storage_from_config(&pool, &config).await.unwrap(),
            Some(store) => {
                let local = LocalStorageProvider::new(
                    &config.storage.local.root_path,
                    &config.storage.local.base_url,
                )
                .await
                .unwrap();
                let storage = DynamicStorage::new(
                    Arc::new(StorageSettingsRepository::new(pool.clone())),
                    Arc::new(local),
                    DynamicStorageOptions::from_config(&config.storage),
                )
                .with_connector(store);
                Arc::new(storage)
            }
        };

        Self {
            engine: Engine::build(pool, &config, storage),
            config,
            _dir: dir,
        }
    }

    /// Create an organization and return its ID.
    pub async fn organization(&self, name: &str) -> Uuid {
        OrganizationRepository::new(self.engine.pool.clone())
            .create(name)
            .await
            .unwrap()
            .id
    }

    /// Subscribe an organization to a plan with unlimited bandwidth.
    pub async fn subscribe(&self, organization_id: Uuid, storage_gb: i64) -> Subscription {
        self.subscribe_with_bandwidth(organization_id, storage_gb, None).await
    }

    /// Subscribe an organization; `bandwidth_gb = Some(n)` enforces a monthly allowance.
    pub async fn subscribe_with_bandwidth(
        &self,
        organization_id: Uuid,
        storage_gb: i64,
        bandwidth_gb: Option<i64>,
    ) -> Subscription {
        let plan = self
            .engine
            .subscriptions
            .create_plan(
                "Business",
                storage_gb,
                bandwidth_gb.unwrap_or(0),
                bandwidth_gb.is_some(),
                25,
            )
            .await
            .unwrap();
        self.engine
            .subscriptions
            .create_subscription(
                organization_id,
                plan.id,
                SubscriptionStatus::Active,
                BillingInterval::Monthly,
                Some(Utc::now() + Duration::days(15)),
                None,
            )
            .await
            .unwrap()
    }

    /// A new member of `organization_id` and their resolved explorer context.
    pub async fn member(&self, organization_id: Uuid, role: Role) -> (Principal, ExplorerContext) {
        let principal = Principal::new(Uuid::new_v4(), organization_id, role);
        let ctx = self.engine.explorer.resolve_context(&principal).await.unwrap();
        (principal, ctx)
    }

    /// Folder repository over the test database.
    pub fn folders(&self) -> FolderRepository {
        FolderRepository::new(self.engine.pool.clone())
    }

    /// Sum of live file sizes, straight from the files table.
    pub async fn live_bytes(&self, organization_id: Uuid) -> u64 {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM files \
             WHERE organization_id = ?1 AND is_deleted = 0",
        )
        .bind(organization_id)
        .fetch_one(&self.engine.pool)
        .await
        .unwrap();
        sum as u64
    }

    /// Cached usage counter.
    pub async fn cached_bytes(&self, organization_id: Uuid) -> u64 {
        self.engine.usage.get(organization_id).await.unwrap().used()
    }
}

/// A plain-text upload.
pub fn text(name: &str, body: &str) -> IncomingFile {
    IncomingFile::new(name, Some("text/plain"), body.as_bytes().to_vec())
}

/// An upload of `size` bytes.
pub fn blob(name: &str, size: usize) -> IncomingFile {
    IncomingFile::new(name, Some("application/octet-stream"), vec![7u8; size])
}

/// In-memory object store shared by every client built from it.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryObjectStore {
    /// Stored bytes under `key`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

impl ObjectConnector for MemoryObjectStore {
    fn connect(&self, _settings: &ObjectStoreSettings) -> AppResult<Arc<dyn StorageProvider>> {
        Ok(Arc::new(MemoryObjectClient(Arc::clone(&self.objects))))
    }
}

#[derive(Debug)]
struct MemoryObjectClient(Arc<Mutex<HashMap<String, Bytes>>>);

#[async_trait]
impl StorageProvider for MemoryObjectClient {
    fn provider_type(&self) -> &str {
        "object"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let data = self.read_bytes(key).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn read_bytes(&self, key: &str) -> AppResult<Bytes> {
        self.0
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Object {key} not found")))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.0.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.0.lock().unwrap().contains_key(key))
    }

    async fn size(&self, key: &str) -> AppResult<u64> {
        Ok(self.read_bytes(key).await?.len() as u64)
    }

    async fn url(&self, key: &str) -> AppResult<String> {
        Ok(format!("memory://{key}"))
    }
}
