//! Subscription, plan, and add-on repository.
//!
//! These tables belong to the billing subsystem; the engine only reads
//! them. The `create_*` methods exist for administration and seeding.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_entity::subscription::{
    AddonPurchase, BillingInterval, Plan, Subscription, SubscriptionStatus,
};

/// Repository for subscription-related reads.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every subscription the organization ever held, newest first.
    pub async fn list_for_organization(&self, organization_id: Uuid) -> AppResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE organization_id = ?1 ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list subscriptions", e))
    }

    /// Find a plan by ID.
    pub async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = ?1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find plan", e))
    }

    /// Active add-on purchases of an organization.
    pub async fn active_addons(&self, organization_id: Uuid) -> AppResult<Vec<AddonPurchase>> {
        sqlx::query_as::<_, AddonPurchase>(
            "SELECT * FROM addon_purchases WHERE organization_id = ?1 AND is_active = 1 \
             ORDER BY created_at ASC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list add-ons", e))
    }

    /// Create a plan.
    pub async fn create_plan(
        &self,
        name: &str,
        storage_gb: i64,
        bandwidth_limit_gb_monthly: i64,
        is_bandwidth_limited: bool,
        max_users: i64,
    ) -> AppResult<Plan> {
        sqlx::query_as::<_, Plan>(
            "INSERT INTO plans (id, name, storage_gb, bandwidth_limit_gb_monthly, is_bandwidth_limited, max_users) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(storage_gb)
        .bind(bandwidth_limit_gb_monthly)
        .bind(is_bandwidth_limited)
        .bind(max_users)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create plan", e))
    }

    /// Create a subscription.
    pub async fn create_subscription(
        &self,
        organization_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
        billing_interval: BillingInterval,
        current_period_end: Option<DateTime<Utc>>,
        trial_end: Option<DateTime<Utc>>,
    ) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (id, organization_id, plan_id, status, billing_interval, \
             current_period_end, trial_end, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(plan_id)
        .bind(status)
        .bind(billing_interval)
        .bind(current_period_end)
        .bind(trial_end)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create subscription", e))
    }

    /// Change a subscription's status.
    pub async fn set_status(&self, subscription_id: Uuid, status: SubscriptionStatus) -> AppResult<()> {
        sqlx::query("UPDATE subscriptions SET status = ?2 WHERE id = ?1")
            .bind(subscription_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update subscription", e)
            })?;
        Ok(())
    }

    /// Record an add-on purchase.
    pub async fn create_addon(
        &self,
        organization_id: Uuid,
        storage_gb: i64,
        quantity: i64,
    ) -> AppResult<AddonPurchase> {
        sqlx::query_as::<_, AddonPurchase>(
            "INSERT INTO addon_purchases (id, organization_id, storage_gb, quantity, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(storage_gb)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create add-on", e))
    }
}
