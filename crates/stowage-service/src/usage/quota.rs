//! Quota/limits resolver: access state, effective limits, and storage admission.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use stowage_core::result::AppResult;
use stowage_database::repositories::SubscriptionRepository;
use stowage_entity::subscription::{AccessState, AddonPurchase, Limits, Plan, Subscription};
use stowage_entity::usage::UsageSnapshot;

use super::cache::UsageService;

/// Read access to the billing subsystem's subscription records.
#[async_trait]
pub trait SubscriptionSource: Send + Sync + 'static {
    /// Every subscription the organization ever held, newest first.
    async fn subscriptions(&self, organization_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// A plan by ID.
    async fn plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>>;

    /// Add-on purchases of the organization.
    async fn addons(&self, organization_id: Uuid) -> AppResult<Vec<AddonPurchase>>;
}

#[async_trait]
impl SubscriptionSource for SubscriptionRepository {
    async fn subscriptions(&self, organization_id: Uuid) -> AppResult<Vec<Subscription>> {
        self.list_for_organization(organization_id).await
    }

    async fn plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>> {
        self.find_plan(plan_id).await
    }

    async fn addons(&self, organization_id: Uuid) -> AppResult<Vec<AddonPurchase>> {
        self.active_addons(organization_id).await
    }
}

/// Everything the engine needs to know about an organization's subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Derived access state.
    pub access: AccessState,
    /// Effective limits; all zero without a current subscription.
    pub limits: Limits,
    /// The current subscription, if any.
    pub subscription: Option<Subscription>,
}

/// Resolves access state and limits from subscriptions and checks capacity.
#[derive(Clone)]
pub struct QuotaResolver {
    /// Subscription records.
    subscriptions: Arc<dyn SubscriptionSource>,
    /// Usage cache.
    usage: Arc<UsageService>,
}

impl std::fmt::Debug for QuotaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaResolver").finish()
    }
}

impl QuotaResolver {
    /// Creates a new quota resolver.
    pub fn new(subscriptions: Arc<dyn SubscriptionSource>, usage: Arc<UsageService>) -> Self {
        Self {
            subscriptions,
            usage,
        }
    }

    /// Resolve access state, limits, and the current subscription in one pass.
    pub async fn resolve(&self, organization_id: Uuid) -> AppResult<QuotaState> {
        self.resolve_at(organization_id, Utc::now()).await
    }

    /// [`resolve`](Self::resolve) as of a given instant.
    pub async fn resolve_at(&self, organization_id: Uuid, now: DateTime<Utc>) -> AppResult<QuotaState> {
        let subscriptions = self.subscriptions.subscriptions(organization_id).await?;
        let access = AccessState::derive(&subscriptions, now);
        let subscription = subscriptions.into_iter().find(|s| s.is_current(now));

        let limits = match &subscription {
            Some(sub) => match self.subscriptions.plan(sub.plan_id).await? {
                Some(plan) => {
                    let addons = self.subscriptions.addons(organization_id).await?;
                    Limits::from_plan(&plan, &addons)
                }
                None => {
                    warn!(
                        organization_id = %organization_id,
                        plan_id = %sub.plan_id,
                        "Current subscription references a missing plan"
                    );
                    Limits::none()
                }
            },
            None => Limits::none(),
        };

        Ok(QuotaState {
            access,
            limits,
            subscription,
        })
    }

    /// The organization's access state.
    pub async fn access_state(&self, organization_id: Uuid) -> AppResult<AccessState> {
        Ok(self.resolve(organization_id).await?.access)
    }

    /// The organization's effective limits.
    pub async fn limits(&self, organization_id: Uuid) -> AppResult<Limits> {
        Ok(self.resolve(organization_id).await?.limits)
    }

    /// Whether `extra_bytes` more fit within the organization's capacity.
    ///
    /// An organization without a plan has a zero limit and can store nothing.
    pub async fn can_store(&self, organization_id: Uuid, extra_bytes: u64) -> AppResult<(bool, UsageSnapshot)> {
        let limits = self.limits(organization_id).await?;
        self.can_store_within(organization_id, &limits, extra_bytes).await
    }

    /// [`can_store`](Self::can_store) against already-resolved limits.
    pub async fn can_store_within(
        &self,
        organization_id: Uuid,
        limits: &Limits,
        extra_bytes: u64,
    ) -> AppResult<(bool, UsageSnapshot)> {
        let usage = self.usage.get(organization_id).await?;
        let snapshot = UsageSnapshot::new(usage.used(), limits.total_storage_bytes());
        Ok((!snapshot.would_exceed(extra_bytes), snapshot))
    }
}
