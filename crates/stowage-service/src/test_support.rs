//! Temporary database and wiring for service tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use stowage_core::config::AppConfig;
use stowage_core::config::database::DatabaseConfig;
use stowage_core::types::settings::StorageMode;
use stowage_database::DatabasePool;
use stowage_database::migration::run_migrations;
use stowage_database::repositories::{
    BandwidthRepository, FolderRepository, OrganizationRepository, SubscriptionRepository,
};
use stowage_entity::file::CreateFile;
use stowage_entity::subscription::{BillingInterval, Plan, Subscription, SubscriptionStatus};
use stowage_storage::SettingsHandle;

use crate::engine::Engine;
use crate::folder::FolderService;
use crate::usage::{BandwidthMeter, QuotaResolver, UsageService};

pub(crate) struct TestDb {
    _dir: TempDir,
    pub engine: Engine,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("stowage.db").display()),
            ..Default::default()
        };
        config.storage.local.root_path = dir.path().join("objects").display().to_string();

        let pool = DatabasePool::connect(&config.database).await.unwrap().into_pool();
        run_migrations(&pool).await.unwrap();
        let storage = Engine::storage_with_settings(Arc::new(SettingsHandle::default()), &config)
            .await
            .unwrap();

        Self {
            engine: Engine::build(pool, &config, storage),
            _dir: dir,
        }
    }

    pub async fn organization(&self, name: &str) -> Uuid {
        OrganizationRepository::new(self.engine.pool.clone())
            .create(name)
            .await
            .unwrap()
            .id
    }

    pub async fn root(&self, organization_id: Uuid, owner_id: Uuid) -> Uuid {
        self.engine
            .folders
            .ensure_root(organization_id, owner_id)
            .await
            .unwrap()
            .id
    }

    pub fn create_file(
        &self,
        organization_id: Uuid,
        owner_id: Uuid,
        folder_id: Uuid,
        name: &str,
        size: i64,
    ) -> CreateFile {
        CreateFile {
            organization_id,
            owner_id,
            folder_id,
            original_filename: name.to_string(),
            storage_key: format!("tests/{}/{name}", Uuid::new_v4()),
            storage_backend: StorageMode::Local,
            size_bytes: size,
            content_type: "text/plain".to_string(),
        }
    }

    pub async fn plan(&self, storage_gb: i64) -> Plan {
        self.subscriptions()
            .create_plan("Team", storage_gb, 100, false, 10)
            .await
            .unwrap()
    }

    pub async fn subscribe(
        &self,
        organization_id: Uuid,
        storage_gb: i64,
        status: SubscriptionStatus,
    ) -> Subscription {
        let plan = self.plan(storage_gb).await;
        self.subscriptions()
            .create_subscription(
                organization_id,
                plan.id,
                status,
                BillingInterval::Monthly,
                Some(Utc::now() + Duration::days(20)),
                None,
            )
            .await
            .unwrap()
    }

    pub fn subscriptions(&self) -> Arc<SubscriptionRepository> {
        Arc::clone(&self.engine.subscriptions)
    }

    pub fn bandwidth(&self) -> Arc<BandwidthRepository> {
        Arc::clone(&self.engine.bandwidth_repo)
    }

    pub fn folders(&self) -> FolderRepository {
        FolderRepository::new(self.engine.pool.clone())
    }

    pub fn usage_service(&self) -> Arc<UsageService> {
        Arc::clone(&self.engine.usage)
    }

    pub fn quota(&self) -> Arc<QuotaResolver> {
        Arc::clone(&self.engine.quota)
    }

    pub fn bandwidth_meter(&self) -> Arc<BandwidthMeter> {
        Arc::clone(&self.engine.bandwidth)
    }

    pub fn folder_service(&self) -> Arc<FolderService> {
        Arc::clone(&self.engine.folders)
    }
}
