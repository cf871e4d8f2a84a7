//! Subscription entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// In a free trial.
    Trialing,
    /// Payment overdue.
    PastDue,
    /// Cancelled by the customer.
    Canceled,
    /// Ran out without renewal.
    Expired,
}

/// Billing interval of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    /// Billed every month.
    Monthly,
    /// Billed every year.
    Yearly,
}

/// An organization's subscription to a storage plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// The subscribing organization.
    pub organization_id: Uuid,
    /// The subscribed plan.
    pub plan_id: Uuid,
    /// Lifecycle status.
    pub status: SubscriptionStatus,
    /// Billing interval.
    pub billing_interval: BillingInterval,
    /// End of the current paid period, if known.
    pub current_period_end: Option<DateTime<Utc>>,
    /// End of the trial, if any.
    pub trial_end: Option<DateTime<Utc>>,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription currently grants storage access.
    ///
    /// Active subscriptions are current until `current_period_end`; trials
    /// until `trial_end`. A missing end date does not expire.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Active => self.current_period_end.is_none_or(|end| end > now),
            SubscriptionStatus::Trialing => self
                .trial_end
                .or(self.current_period_end)
                .is_none_or(|end| end > now),
            SubscriptionStatus::PastDue
            | SubscriptionStatus::Canceled
            | SubscriptionStatus::Expired => false,
        }
    }

    /// The date the current billing cycle is anchored to, if known.
    pub fn cycle_anchor(&self) -> Option<DateTime<Utc>> {
        match self.status {
            SubscriptionStatus::Trialing => self.trial_end.or(self.current_period_end),
            _ => self.current_period_end.or(self.trial_end),
        }
    }
}
