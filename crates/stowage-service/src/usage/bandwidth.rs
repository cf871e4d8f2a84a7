//! Bandwidth meter: per-cycle counter of bytes served.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use stowage_core::config::bandwidth::BandwidthConfig;
use stowage_core::result::AppResult;
use stowage_database::repositories::BandwidthRepository;
use stowage_entity::subscription::{BillingInterval, Limits, Subscription};
use stowage_entity::usage::BandwidthSnapshot;

use super::quota::QuotaResolver;
use crate::{begin, commit, rollback};

/// Length of one billing cycle for a subscription shape.
pub fn cycle_length(interval: Option<BillingInterval>, config: &BandwidthConfig) -> Duration {
    match interval {
        Some(BillingInterval::Yearly) => Duration::days(config.yearly_cycle_days),
        Some(BillingInterval::Monthly) | None => Duration::days(config.monthly_cycle_days),
    }
}

/// First day of the billing cycle that contains `now`.
///
/// Anchored to the subscription's period end (or trial end while trialing)
/// minus one cycle length; without an anchor, `now` minus one cycle length.
pub fn cycle_start_for(
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
    config: &BandwidthConfig,
) -> NaiveDate {
    let length = cycle_length(subscription.map(|s| s.billing_interval), config);
    let anchor = subscription.and_then(Subscription::cycle_anchor).unwrap_or(now);
    (anchor - length).date_naive()
}

/// Meters bytes served per organization and billing cycle.
#[derive(Debug, Clone)]
pub struct BandwidthMeter {
    /// Pool used to open transactions.
    pool: SqlitePool,
    /// Bandwidth repository.
    bandwidth_repo: Arc<BandwidthRepository>,
    /// Subscription and limits resolver.
    quota: Arc<QuotaResolver>,
    /// Cycle lengths.
    config: BandwidthConfig,
}

impl BandwidthMeter {
    /// Creates a new bandwidth meter.
    pub fn new(
        pool: SqlitePool,
        bandwidth_repo: Arc<BandwidthRepository>,
        quota: Arc<QuotaResolver>,
        config: BandwidthConfig,
    ) -> Self {
        Self {
            pool,
            bandwidth_repo,
            quota,
            config,
        }
    }

    /// Admit `size_bytes` of downloads against the current cycle.
    ///
    /// Returns whether the bytes were admitted together with the usage
    /// snapshot: after the increment when admitted, unchanged when not.
    pub async fn apply_usage(&self, organization_id: Uuid, size_bytes: u64) -> AppResult<(bool, BandwidthSnapshot)> {
        let state = self.quota.resolve(organization_id).await?;
        let cycle_start = cycle_start_for(state.subscription.as_ref(), Utc::now(), &self.config);
        self.apply_usage_in_cycle(organization_id, cycle_start, &state.limits, size_bytes)
            .await
    }

    /// [`apply_usage`](Self::apply_usage) for an explicit cycle and limits.
    pub async fn apply_usage_in_cycle(
        &self,
        organization_id: Uuid,
        cycle_start: NaiveDate,
        limits: &Limits,
        size_bytes: u64,
    ) -> AppResult<(bool, BandwidthSnapshot)> {
        let is_limited = limits.enforces_bandwidth();
        let limit_bytes = limits.bandwidth_limit_bytes();

        let mut tx = begin(&self.pool).await?;
        let row = BandwidthRepository::lock(&mut *tx, organization_id, cycle_start).await?;
        let used = row.used();
        let projected = used.saturating_add(size_bytes);

        if is_limited && projected > limit_bytes {
            rollback(tx).await?;
            warn!(
                organization_id = %organization_id,
                cycle_start = %cycle_start,
                used,
                limit = limit_bytes,
                requested = size_bytes,
                "Bandwidth limit reached"
            );
            return Ok((
                false,
                BandwidthSnapshot {
                    cycle_start,
                    used_bytes: used,
                    limit_bytes,
                    is_limited,
                },
            ));
        }

        let stored = i64::try_from(projected).unwrap_or(i64::MAX);
        let row = BandwidthRepository::set_used(&mut *tx, organization_id, cycle_start, stored).await?;
        commit(tx).await?;

        info!(
            organization_id = %organization_id,
            cycle_start = %cycle_start,
            bytes = size_bytes,
            used = row.used_bandwidth_bytes,
            "Bandwidth recorded"
        );
        Ok((
            true,
            BandwidthSnapshot {
                cycle_start,
                used_bytes: row.used(),
                limit_bytes,
                is_limited,
            },
        ))
    }

    /// Current-cycle usage without recording anything.
    pub async fn snapshot(&self, organization_id: Uuid) -> AppResult<BandwidthSnapshot> {
        let state = self.quota.resolve(organization_id).await?;
        let cycle_start = cycle_start_for(state.subscription.as_ref(), Utc::now(), &self.config);
        let used = self
            .bandwidth_repo
            .find(organization_id, cycle_start)
            .await?
            .map(|row| row.used())
            .unwrap_or(0);

        Ok(BandwidthSnapshot {
            cycle_start,
            used_bytes: used,
            limit_bytes: state.limits.bandwidth_limit_bytes(),
            is_limited: state.limits.enforces_bandwidth(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;
    use stowage_entity::BYTES_PER_GB;
    use stowage_entity::subscription::SubscriptionStatus;

    fn subscription(interval: BillingInterval, status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status,
            billing_interval: interval,
            current_period_end: Some(Utc::now()),
            trial_end: None,
            created_at: Utc::now(),
        }
    }

    fn limited(limit_gb: i64) -> Limits {
        Limits {
            bandwidth_limit_gb_monthly: limit_gb,
            is_bandwidth_limited: true,
            ..Limits::none()
        }
    }

    #[test]
    fn test_cycle_start_anchors_to_period_end() {
        let config = BandwidthConfig::default();
        let mut sub = subscription(BillingInterval::Monthly, SubscriptionStatus::Active);
        let end = DateTime::parse_from_rfc3339("2025-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        sub.current_period_end = Some(end);

        let start = cycle_start_for(Some(&sub), Utc::now(), &config);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        sub.billing_interval = BillingInterval::Yearly;
        let start = cycle_start_for(Some(&sub), Utc::now(), &config);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_cycle_start_prefers_trial_end_while_trialing() {
        let config = BandwidthConfig::default();
        let mut sub = subscription(BillingInterval::Monthly, SubscriptionStatus::Trialing);
        let trial_end = DateTime::parse_from_rfc3339("2025-06-30T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        sub.trial_end = Some(trial_end);

        let start = cycle_start_for(Some(&sub), Utc::now(), &config);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap());
    }

    #[test]
    fn test_cycle_start_without_anchor_uses_now() {
        let config = BandwidthConfig::default();
        let now = Utc::now();
        assert_eq!(
            cycle_start_for(None, now, &config),
            (now - Duration::days(30)).date_naive()
        );
    }

    #[tokio::test]
    async fn test_limited_cycle_rejects_without_mutating() {
        let db = TestDb::new().await;
        let org = db.organization("Acme").await;
        let meter = db.bandwidth_meter();
        let cycle = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let limits = limited(10);

        let (ok, snap) = meter
            .apply_usage_in_cycle(org, cycle, &limits, 9 * BYTES_PER_GB)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(snap.used_bytes, 9 * BYTES_PER_GB);

        let (ok, snap) = meter
            .apply_usage_in_cycle(org, cycle, &limits, 2 * BYTES_PER_GB)
            .await
            .unwrap();
        assert!(!ok);
        assert!(snap.is_limited);
        assert_eq!(snap.used_bytes, 9 * BYTES_PER_GB);

        let (ok, snap) = meter
            .apply_usage_in_cycle(org, cycle, &limits, BYTES_PER_GB)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(snap.used_bytes, 10 * BYTES_PER_GB);
    }

    #[tokio::test]
    async fn test_unlimited_plans_always_admit() {
        let db = TestDb::new().await;
        let org = db.organization("Acme").await;
        let meter = db.bandwidth_meter();
        let cycle = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let mut limits = limited(0);
        let (ok, snap) = meter
            .apply_usage_in_cycle(org, cycle, &limits, 5 * BYTES_PER_GB)
            .await
            .unwrap();
        assert!(ok);
        assert!(!snap.is_limited);

        limits.bandwidth_limit_gb_monthly = 1;
        limits.is_bandwidth_limited = false;
        let (ok, snap) = meter
            .apply_usage_in_cycle(org, cycle, &limits, 5 * BYTES_PER_GB)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(snap.used_bytes, 10 * BYTES_PER_GB);
    }

    #[tokio::test]
    async fn test_new_cycle_starts_a_new_row() {
        let db = TestDb::new().await;
        let org = db.organization("Acme").await;
        let meter = db.bandwidth_meter();
        let limits = limited(1);
        let january = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let february = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

        meter.apply_usage_in_cycle(org, january, &limits, BYTES_PER_GB).await.unwrap();
        let (ok, snap) = meter
            .apply_usage_in_cycle(org, february, &limits, BYTES_PER_GB)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(snap.used_bytes, BYTES_PER_GB);
        assert_eq!(db.bandwidth().history(org).await.unwrap().len(), 2);
    }
}
