//! Wiring of repositories and services into one shareable engine.

use std::sync::Arc;

use sqlx::SqlitePool;

use stowage_core::config::AppConfig;
use stowage_core::result::AppResult;
use stowage_core::traits::settings::SettingsSource;
use stowage_database::repositories::{
    BandwidthRepository, FileRepository, FolderRepository, OrganizationRepository,
    StorageSettingsRepository, SubscriptionRepository, UsageRepository,
};
use stowage_storage::providers::LocalStorageProvider;
use stowage_storage::{DynamicStorage, DynamicStorageOptions};

use crate::explorer::ExplorerService;
use crate::file::{FileService, UploadValidator};
use crate::folder::FolderService;
use crate::rate_limit::UploadRateLimiter;
use crate::usage::{BandwidthMeter, QuotaResolver, UsageService};

/// Every service of the engine, built once and shared via `Arc`.
#[derive(Debug, Clone)]
pub struct Engine {
    /// Database pool.
    pub pool: SqlitePool,
    /// Backend selector.
    pub storage: Arc<DynamicStorage>,
    /// Organization repository.
    pub organizations: Arc<OrganizationRepository>,
    /// Subscription repository.
    pub subscriptions: Arc<SubscriptionRepository>,
    /// Bandwidth history repository.
    pub bandwidth_repo: Arc<BandwidthRepository>,
    /// Storage settings repository.
    pub settings: Arc<StorageSettingsRepository>,
    /// Usage cache.
    pub usage: Arc<UsageService>,
    /// Quota resolver.
    pub quota: Arc<QuotaResolver>,
    /// Bandwidth meter.
    pub bandwidth: Arc<BandwidthMeter>,
    /// Folder tree service.
    pub folders: Arc<FolderService>,
    /// File service.
    pub files: Arc<FileService>,
    /// Explorer orchestration.
    pub explorer: Arc<ExplorerService>,
}

impl Engine {
    /// Build a selector over the persisted storage settings and the configured local root.
    pub async fn storage_from_config(pool: &SqlitePool, config: &AppConfig) -> AppResult<Arc<DynamicStorage>> {
        let settings: Arc<dyn SettingsSource> = Arc::new(StorageSettingsRepository::new(pool.clone()));
        Self::storage_with_settings(settings, config).await
    }

    /// Build a selector over an arbitrary settings source.
    pub async fn storage_with_settings(
        settings: Arc<dyn SettingsSource>,
        config: &AppConfig,
    ) -> AppResult<Arc<DynamicStorage>> {
        let local = LocalStorageProvider::new(
            &config.storage.local.root_path,
            &config.storage.local.base_url,
        )
        .await?;
        Ok(Arc::new(DynamicStorage::new(
            settings,
            Arc::new(local),
            DynamicStorageOptions::from_config(&config.storage),
        )))
    }

    /// Wire every service.
    pub fn build(pool: SqlitePool, config: &AppConfig, storage: Arc<DynamicStorage>) -> Self {
        let organizations = Arc::new(OrganizationRepository::new(pool.clone()));
        let subscriptions = Arc::new(SubscriptionRepository::new(pool.clone()));
        let bandwidth_repo = Arc::new(BandwidthRepository::new(pool.clone()));
        let settings = Arc::new(StorageSettingsRepository::new(pool.clone()));
        let folder_repo = Arc::new(FolderRepository::new(pool.clone()));
        let file_repo = Arc::new(FileRepository::new(pool.clone()));
        let usage_repo = Arc::new(UsageRepository::new(pool.clone()));

        let usage = Arc::new(UsageService::new(pool.clone(), usage_repo));
        let quota = Arc::new(QuotaResolver::new(subscriptions.clone(), Arc::clone(&usage)));
        let bandwidth = Arc::new(BandwidthMeter::new(
            pool.clone(),
            Arc::clone(&bandwidth_repo),
            Arc::clone(&quota),
            config.bandwidth.clone(),
        ));
        let folders = Arc::new(FolderService::new(
            pool.clone(),
            folder_repo,
            Arc::clone(&file_repo),
            Arc::clone(&usage),
            Arc::clone(&storage),
        ));
        let files = Arc::new(FileService::new(
            pool.clone(),
            file_repo,
            Arc::clone(&usage),
            Arc::clone(&storage),
        ));
        let explorer = Arc::new(ExplorerService::new(
            Arc::clone(&quota),
            Arc::clone(&usage),
            Arc::clone(&bandwidth),
            Arc::clone(&folders),
            Arc::clone(&files),
            Arc::clone(&organizations),
            Arc::clone(&storage),
            UploadValidator::new(config.upload.clone()),
            UploadRateLimiter::new(config.rate_limit.clone()),
        ));

        Self {
            pool,
            storage,
            organizations,
            subscriptions,
            bandwidth_repo,
            settings,
            usage,
            quota,
            bandwidth,
            folders,
            files,
            explorer,
        }
    }
}
