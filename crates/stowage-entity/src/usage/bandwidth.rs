//! Per-organization, per-cycle bandwidth counter row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Bytes served to an organization during one billing cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrgBandwidthUsage {
    /// The organization.
    pub organization_id: Uuid,
    /// First day of the billing cycle.
    pub cycle_start: NaiveDate,
    /// Bytes served so far this cycle.
    pub used_bandwidth_bytes: i64,
    /// Bumped on every mutation.
    pub version: i64,
}

impl OrgBandwidthUsage {
    /// Used bytes as an unsigned count.
    pub fn used(&self) -> u64 {
        u64::try_from(self.used_bandwidth_bytes).unwrap_or(0)
    }
}
