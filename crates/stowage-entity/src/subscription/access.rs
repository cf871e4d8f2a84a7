//! Storage access state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Subscription;

/// What an organization may do with its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    /// Never subscribed: everything is blocked, including reads.
    None,
    /// Subscription lapsed: reads allowed, writes rejected.
    ReadOnly,
    /// A current subscription exists.
    Active,
}

impl AccessState {
    /// Derive the state from every subscription the organization ever held.
    pub fn derive(subscriptions: &[Subscription], now: DateTime<Utc>) -> Self {
        if subscriptions.iter().any(|s| s.is_current(now)) {
            Self::Active
        } else if subscriptions.is_empty() {
            Self::None
        } else {
            Self::ReadOnly
        }
    }

    /// Whether listing and downloading are permitted.
    pub fn can_read(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether uploads and tree mutations are permitted.
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Return the state as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ReadOnly => "read_only",
            Self::Active => "active",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::model::{BillingInterval, SubscriptionStatus};
    use chrono::Duration;
    use uuid::Uuid;

    fn subscription(status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status,
            billing_interval: BillingInterval::Yearly,
            current_period_end: Some(Utc::now() + Duration::days(10)),
            trial_end: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_never_subscribed_is_none() {
        let state = AccessState::derive(&[], Utc::now());
        assert_eq!(state, AccessState::None);
        assert!(!state.can_read());
    }

    #[test]
    fn test_lapsed_is_read_only() {
        let state = AccessState::derive(&[subscription(SubscriptionStatus::Canceled)], Utc::now());
        assert_eq!(state, AccessState::ReadOnly);
        assert!(state.can_read());
        assert!(!state.can_write());
    }

    #[test]
    fn test_any_current_is_active() {
        let subs = [
            subscription(SubscriptionStatus::Expired),
            subscription(SubscriptionStatus::Active),
        ];
        assert_eq!(AccessState::derive(&subs, Utc::now()), AccessState::Active);
    }
}
