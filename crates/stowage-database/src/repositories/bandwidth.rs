//! Bandwidth meter repository.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_entity::usage::OrgBandwidthUsage;

/// Repository for per-cycle bandwidth counters.
#[derive(Debug, Clone)]
pub struct BandwidthRepository {
    pool: SqlitePool,
}

impl BandwidthRepository {
    /// Create a new bandwidth repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read one cycle's counter if it exists.
    pub async fn find(&self, organization_id: Uuid, cycle_start: NaiveDate) -> AppResult<Option<OrgBandwidthUsage>> {
        sqlx::query_as::<_, OrgBandwidthUsage>(
            "SELECT * FROM org_bandwidth_usage WHERE organization_id = ?1 AND cycle_start = ?2",
        )
        .bind(organization_id)
        .bind(cycle_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read bandwidth", e))
    }

    /// All recorded cycles of an organization, newest first.
    pub async fn history(&self, organization_id: Uuid) -> AppResult<Vec<OrgBandwidthUsage>> {
        sqlx::query_as::<_, OrgBandwidthUsage>(
            "SELECT * FROM org_bandwidth_usage WHERE organization_id = ?1 ORDER BY cycle_start DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read bandwidth history", e)
        })
    }

    /// Lock (creating if needed) the cycle row for the rest of the transaction.
    pub async fn lock(
        conn: &mut SqliteConnection,
        organization_id: Uuid,
        cycle_start: NaiveDate,
    ) -> AppResult<OrgBandwidthUsage> {
        sqlx::query_as::<_, OrgBandwidthUsage>(
            "INSERT INTO org_bandwidth_usage (organization_id, cycle_start, used_bandwidth_bytes, version) \
             VALUES (?1, ?2, 0, 0) \
             ON CONFLICT(organization_id, cycle_start) DO UPDATE SET version = org_bandwidth_usage.version \
             RETURNING *",
        )
        .bind(organization_id)
        .bind(cycle_start)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock bandwidth row", e))
    }

    /// Persist a new used value for a locked cycle row.
    pub async fn set_used(
        conn: &mut SqliteConnection,
        organization_id: Uuid,
        cycle_start: NaiveDate,
        used_bytes: i64,
    ) -> AppResult<OrgBandwidthUsage> {
        sqlx::query_as::<_, OrgBandwidthUsage>(
            "UPDATE org_bandwidth_usage SET used_bandwidth_bytes = ?3, version = version + 1 \
             WHERE organization_id = ?1 AND cycle_start = ?2 RETURNING *",
        )
        .bind(organization_id)
        .bind(cycle_start)
        .bind(used_bytes.max(0))
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update bandwidth", e))?
        .ok_or_else(|| AppError::internal("Bandwidth row is not locked"))
    }
}
