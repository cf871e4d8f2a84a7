//! Storage usage cache repository.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_entity::usage::OrgStorageUsage;

/// Repository for the per-organization usage counter.
///
/// Every mutating method takes the caller's transaction and must be preceded
/// by [`lock`](Self::lock), which is the transaction's first write and so
/// serializes concurrent writers of the same organization.
#[derive(Debug, Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    /// Create a new usage repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read the counter without locking, creating a zeroed row on first access.
    pub async fn get_or_create(&self, organization_id: Uuid) -> AppResult<OrgStorageUsage> {
        if let Some(usage) = self.find(organization_id).await? {
            return Ok(usage);
        }

        sqlx::query(
            "INSERT INTO org_storage_usage (organization_id, used_storage_bytes, version) \
             VALUES (?1, 0, 0) ON CONFLICT(organization_id) DO NOTHING",
        )
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create usage row", e))?;

        self.find(organization_id)
            .await?
            .ok_or_else(|| AppError::internal("Usage row vanished after creation"))
    }

    /// Read the counter if a row exists.
    pub async fn find(&self, organization_id: Uuid) -> AppResult<Option<OrgStorageUsage>> {
        sqlx::query_as::<_, OrgStorageUsage>(
            "SELECT * FROM org_storage_usage WHERE organization_id = ?1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read usage", e))
    }

    /// Lock (creating if needed) the organization's row for the rest of the transaction.
    pub async fn lock(conn: &mut SqliteConnection, organization_id: Uuid) -> AppResult<OrgStorageUsage> {
        sqlx::query_as::<_, OrgStorageUsage>(
            "INSERT INTO org_storage_usage (organization_id, used_storage_bytes, version) \
             VALUES (?1, 0, 0) \
             ON CONFLICT(organization_id) DO UPDATE SET version = org_storage_usage.version \
             RETURNING *",
        )
        .bind(organization_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock usage row", e))
    }

    /// Add `delta` (may be negative) to the counter, clamping at zero.
    pub async fn apply_delta(
        conn: &mut SqliteConnection,
        organization_id: Uuid,
        delta: i64,
    ) -> AppResult<OrgStorageUsage> {
        sqlx::query_as::<_, OrgStorageUsage>(
            "UPDATE org_storage_usage \
             SET used_storage_bytes = MAX(0, used_storage_bytes + ?2), version = version + 1 \
             WHERE organization_id = ?1 RETURNING *",
        )
        .bind(organization_id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update usage", e))?
        .ok_or_else(|| AppError::internal(format!("Usage row for {organization_id} is not locked")))
    }

    /// Overwrite the counter with a recomputed value.
    pub async fn overwrite(
        conn: &mut SqliteConnection,
        organization_id: Uuid,
        used_bytes: i64,
        calculated_at: DateTime<Utc>,
    ) -> AppResult<OrgStorageUsage> {
        sqlx::query_as::<_, OrgStorageUsage>(
            "UPDATE org_storage_usage \
             SET used_storage_bytes = ?2, last_calculated_at = ?3, version = version + 1 \
             WHERE organization_id = ?1 RETURNING *",
        )
        .bind(organization_id)
        .bind(used_bytes.max(0))
        .bind(calculated_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to overwrite usage", e))?
        .ok_or_else(|| AppError::internal(format!("Usage row for {organization_id} is not locked")))
    }

    /// Every organization that has a usage row or any file row.
    pub async fn organizations_to_reconcile(&self) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT organization_id FROM org_storage_usage \
             UNION SELECT organization_id FROM files \
             ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to enumerate organizations", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DatabasePool;
    use crate::migration::run_migrations;
    use crate::repositories::OrganizationRepository;
    use stowage_core::config::database::DatabaseConfig;

    async fn setup() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("usage.db").display()),
            ..Default::default()
        };
        let db = DatabasePool::connect(&config).await.unwrap();
        run_migrations(db.pool()).await.unwrap();
        (dir, db.into_pool())
    }

    #[tokio::test]
    async fn test_get_or_create_is_lazy_and_zeroed() {
        let (_dir, pool) = setup().await;
        let org = OrganizationRepository::new(pool.clone()).create("Acme").await.unwrap();
        let repo = UsageRepository::new(pool);

        assert!(repo.find(org.id).await.unwrap().is_none());
        let usage = repo.get_or_create(org.id).await.unwrap();
        assert_eq!(usage.used_storage_bytes, 0);
        assert_eq!(repo.get_or_create(org.id).await.unwrap(), usage);
    }

    #[tokio::test]
    async fn test_delta_clamps_at_zero() {
        let (_dir, pool) = setup().await;
        let org = OrganizationRepository::new(pool.clone()).create("Acme").await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        UsageRepository::lock(&mut tx, org.id).await.unwrap();
        let usage = UsageRepository::apply_delta(&mut tx, org.id, 40).await.unwrap();
        assert_eq!(usage.used_storage_bytes, 40);
        let usage = UsageRepository::apply_delta(&mut tx, org.id, -100).await.unwrap();
        assert_eq!(usage.used_storage_bytes, 0);
        assert_eq!(usage.version, 2);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_rolled_back_delta_is_invisible() {
        let (_dir, pool) = setup().await;
        let org = OrganizationRepository::new(pool.clone()).create("Acme").await.unwrap();
        let repo = UsageRepository::new(pool.clone());
        repo.get_or_create(org.id).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        UsageRepository::lock(&mut tx, org.id).await.unwrap();
        UsageRepository::apply_delta(&mut tx, org.id, 99).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(repo.find(org.id).await.unwrap().unwrap().used_storage_bytes, 0);
    }
}
