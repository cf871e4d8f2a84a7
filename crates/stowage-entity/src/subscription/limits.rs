//! Effective limits derived from a plan and add-ons.

use serde::{Deserialize, Serialize};

use super::addon::AddonPurchase;
use super::plan::Plan;
use crate::BYTES_PER_GB;

/// Capacity and bandwidth allowances of an organization.
///
/// Recomputed on every request from the active plan and add-ons; never
/// persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Base storage from the plan, in GB.
    pub plan_storage_gb: i64,
    /// Number of purchased add-on slots.
    pub addon_slots: i64,
    /// Storage from add-ons, in GB.
    pub addon_storage_gb: i64,
    /// `plan_storage_gb + addon_storage_gb`.
    pub total_storage_gb: i64,
    /// Monthly bandwidth allowance, in GB.
    pub bandwidth_limit_gb_monthly: i64,
    /// Whether the bandwidth allowance is enforced.
    pub is_bandwidth_limited: bool,
    /// Maximum seats.
    pub max_users: i64,
}

impl Limits {
    /// Limits of an organization with no active plan: nothing may be stored.
    pub fn none() -> Self {
        Self::default()
    }

    /// Combine a plan with the organization's active add-on purchases.
    pub fn from_plan(plan: &Plan, addons: &[AddonPurchase]) -> Self {
        let active = addons.iter().filter(|a| a.is_active);
        let (addon_slots, addon_storage_gb) = active.fold((0i64, 0i64), |(slots, gb), a| {
            (slots + a.quantity.max(0), gb + a.total_gb())
        });
        let plan_storage_gb = plan.storage_gb.max(0);

        Self {
            plan_storage_gb,
            addon_slots,
            addon_storage_gb,
            total_storage_gb: plan_storage_gb + addon_storage_gb,
            bandwidth_limit_gb_monthly: plan.bandwidth_limit_gb_monthly.max(0),
            is_bandwidth_limited: plan.is_bandwidth_limited,
            max_users: plan.max_users,
        }
    }

    /// Total allowed storage in bytes.
    pub fn total_storage_bytes(&self) -> u64 {
        gb_to_bytes(self.total_storage_gb)
    }

    /// Monthly bandwidth allowance in bytes.
    pub fn bandwidth_limit_bytes(&self) -> u64 {
        gb_to_bytes(self.bandwidth_limit_gb_monthly)
    }

    /// Whether downloads are metered against a positive allowance.
    pub fn enforces_bandwidth(&self) -> bool {
        self.is_bandwidth_limited && self.bandwidth_limit_gb_monthly > 0
    }
}

fn gb_to_bytes(gb: i64) -> u64 {
    u64::try_from(gb).unwrap_or(0).saturating_mul(BYTES_PER_GB)
}
