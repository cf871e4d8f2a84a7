//! # stowage-service
//!
//! Business logic for Stowage. Each service orchestrates repositories and
//! the storage selector to implement one area: usage accounting, quota
//! resolution, bandwidth metering, the folder tree, and the explorer
//! operations that tie them together.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references. [`Engine`] wires them.

pub mod context;
pub mod engine;
pub mod explorer;
pub mod file;
pub mod folder;
pub mod rate_limit;
pub mod usage;

#[cfg(test)]
mod test_support;

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_database::repositories::UsageRepository;

pub use context::{ExplorerContext, Principal};
pub use engine::Engine;
pub use explorer::{BulkDownload, Download, ExplorerService, SearchScope, UsageOverview};
pub use file::{FileService, IncomingFile, UploadValidator};
pub use folder::{CascadeReport, FolderListing, FolderService, SearchHit};
pub use rate_limit::UploadRateLimiter;
pub use usage::{BandwidthMeter, QuotaResolver, QuotaState, RebuildReport, UsageService};

/// Open a write transaction.
pub(crate) async fn begin(pool: &SqlitePool) -> AppResult<Transaction<'static, Sqlite>> {
    pool.begin()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))
}

/// Open a write transaction holding the organization's usage-row lock.
///
/// Tree changes and usage changes of one organization serialize on this lock.
pub(crate) async fn lock_organization(
    pool: &SqlitePool,
    organization_id: Uuid,
) -> AppResult<Transaction<'static, Sqlite>> {
    let mut tx = begin(pool).await?;
    UsageRepository::lock(&mut *tx, organization_id).await?;
    Ok(tx)
}

/// Commit a transaction.
pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
}

/// Roll a transaction back explicitly.
pub(crate) async fn rollback(tx: Transaction<'static, Sqlite>) -> AppResult<()> {
    tx.rollback()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e))
}
