//! Usage cache service: the per-organization byte counter and its repair path.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use stowage_core::error::AppError;
use stowage_core::result::AppResult;
use stowage_database::repositories::{FileRepository, FolderRepository, UsageRepository};
use stowage_entity::file::{CreateFile, File};
use stowage_entity::usage::{OrgStorageUsage, UsageSnapshot};

use crate::{begin, commit};

/// Outcome of recomputing one organization's counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// The organization.
    pub organization_id: Uuid,
    /// Cached value before the rebuild.
    pub previous_bytes: u64,
    /// Value recomputed from live files.
    pub rebuilt_bytes: u64,
}

impl RebuildReport {
    /// Signed difference between the recomputed and the cached value.
    pub fn drift(&self) -> i64 {
        self.rebuilt_bytes as i64 - self.previous_bytes as i64
    }
}

/// Maintains the per-organization usage counter.
///
/// Every mutation runs in one transaction whose first statement locks the
/// organization's usage row, so concurrent writers of the same organization
/// serialize while different organizations proceed independently.
#[derive(Debug, Clone)]
pub struct UsageService {
    /// Pool used to open transactions.
    pool: SqlitePool,
    /// Usage repository.
    usage_repo: Arc<UsageRepository>,
}

impl UsageService {
    /// Creates a new usage service.
    pub fn new(pool: SqlitePool, usage_repo: Arc<UsageRepository>) -> Self {
        Self { pool, usage_repo }
    }

    /// Current counter, created zeroed on first access.
    pub async fn get(&self, organization_id: Uuid) -> AppResult<OrgStorageUsage> {
        self.usage_repo.get_or_create(organization_id).await
    }

    /// Add bytes to the counter.
    pub async fn increment(&self, organization_id: Uuid, bytes: u64) -> AppResult<OrgStorageUsage> {
        self.adjust(organization_id, to_delta(bytes)).await
    }

    /// Remove bytes from the counter, clamping at zero.
    pub async fn decrement(&self, organization_id: Uuid, bytes: u64) -> AppResult<OrgStorageUsage> {
        self.adjust(organization_id, -to_delta(bytes)).await
    }

    async fn adjust(&self, organization_id: Uuid, delta: i64) -> AppResult<OrgStorageUsage> {
        let mut tx = begin(&self.pool).await?;
        let current = UsageRepository::lock(&mut *tx, organization_id).await?;
        if delta < 0 && current.used_storage_bytes < -delta {
            warn!(
                organization_id = %organization_id,
                used = current.used_storage_bytes,
                delta,
                "Usage decrement exceeds cached value; clamping at zero"
            );
        }
        let updated = UsageRepository::apply_delta(&mut *tx, organization_id, delta).await?;
        commit(tx).await?;
        Ok(updated)
    }

    /// Recompute the counter from live files and overwrite the cached value.
    pub async fn rebuild(&self, organization_id: Uuid) -> AppResult<OrgStorageUsage> {
        let (usage, _) = self.rebuild_with_report(organization_id).await?;
        Ok(usage)
    }

    /// [`rebuild`](Self::rebuild), reporting the counter before and after.
    pub async fn rebuild_report(&self, organization_id: Uuid) -> AppResult<RebuildReport> {
        let (_, report) = self.rebuild_with_report(organization_id).await?;
        Ok(report)
    }

    /// Rebuild every organization that has a usage row or any file.
    ///
    /// A failure on one organization is logged and does not stop the sweep.
    pub async fn rebuild_all(&self) -> AppResult<Vec<RebuildReport>> {
        let organizations = self.usage_repo.organizations_to_reconcile().await?;
        let mut reports = Vec::with_capacity(organizations.len());

        for organization_id in organizations {
            match self.rebuild_with_report(organization_id).await {
                Ok((_, report)) => reports.push(report),
                Err(e) => warn!(
                    organization_id = %organization_id,
                    error = %e,
                    "Usage rebuild failed"
                ),
            }
        }

        let drifted = reports.iter().filter(|r| r.drift() != 0).count();
        info!(
            organizations = reports.len(),
            drifted,
            "Usage reconciliation sweep completed"
        );
        Ok(reports)
    }

    async fn rebuild_with_report(
        &self,
        organization_id: Uuid,
    ) -> AppResult<(OrgStorageUsage, RebuildReport)> {
        let mut tx = begin(&self.pool).await?;
        let previous = UsageRepository::lock(&mut *tx, organization_id).await?;
        let live = FileRepository::sum_live_bytes(&mut *tx, organization_id).await?;
        let usage = UsageRepository::overwrite(&mut *tx, organization_id, live, Utc::now()).await?;
        commit(tx).await?;

        let report = RebuildReport {
            organization_id,
            previous_bytes: previous.used(),
            rebuilt_bytes: usage.used(),
        };
        if report.drift() != 0 {
            warn!(
                organization_id = %organization_id,
                previous = report.previous_bytes,
                rebuilt = report.rebuilt_bytes,
                drift = report.drift(),
                "Usage cache drift repaired"
            );
        }
        Ok((usage, report))
    }

    /// Commit a freshly stored upload: file row plus counter increment, atomically.
    ///
    /// The limit is re-checked under the usage-row lock. If the folder was
    /// deleted since the upload was admitted the commit fails with `NotFound`.
    /// The stored name may gain a ` (n)` suffix to stay unique in the folder.
    pub async fn record_upload(&self, data: CreateFile, limit_bytes: u64) -> AppResult<File> {
        let organization_id = data.organization_id;
        let size = u64::try_from(data.size_bytes).unwrap_or(0);

        let mut tx = begin(&self.pool).await?;
        let usage = UsageRepository::lock(&mut *tx, organization_id).await?;

        let snapshot = UsageSnapshot::new(usage.used(), limit_bytes);
        if snapshot.would_exceed(size) {
            return Err(AppError::storage_limit_exceeded(usage.used(), limit_bytes));
        }
        if !FolderRepository::is_live(&mut *tx, data.folder_id).await? {
            return Err(AppError::not_found("Target folder no longer exists"));
        }

        let name = FileRepository::available_name(&mut *tx, data.folder_id, &data.original_filename).await?;
        let file = FileRepository::insert(
            &mut *tx,
            &CreateFile {
                original_filename: name,
                ..data
            },
        )
        .await?;
        let usage = UsageRepository::apply_delta(&mut *tx, organization_id, file.size_bytes).await?;
        commit(tx).await?;

        info!(
            organization_id = %organization_id,
            file_id = %file.id,
            bytes = file.size_bytes,
            used = usage.used_storage_bytes,
            "Upload committed"
        );
        Ok(file)
    }

    /// Flag a file deleted and decrement the counter by its size, atomically.
    ///
    /// Returns `None` if the file was already deleted, in which case the
    /// counter is left alone.
    pub async fn record_delete(&self, file: &File) -> AppResult<Option<File>> {
        let mut tx = begin(&self.pool).await?;
        UsageRepository::lock(&mut *tx, file.organization_id).await?;

        let Some(deleted) = FileRepository::mark_deleted_if_live(&mut *tx, file.id).await? else {
            return Ok(None);
        };
        UsageRepository::apply_delta(&mut *tx, file.organization_id, -deleted.size_bytes).await?;
        commit(tx).await?;

        info!(
            organization_id = %deleted.organization_id,
            file_id = %deleted.id,
            bytes = deleted.size_bytes,
            "File deleted"
        );
        Ok(Some(deleted))
    }
}

fn to_delta(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}
