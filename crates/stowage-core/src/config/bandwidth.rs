//! Bandwidth metering configuration.

use serde::{Deserialize, Serialize};

/// Billing cycle lengths used to derive bandwidth cycle starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandwidthConfig {
    /// Cycle length for monthly subscriptions, in days.
    #[serde(default = "default_monthly")]
    pub monthly_cycle_days: i64,
    /// Cycle length for yearly subscriptions, in days.
    #[serde(default = "default_yearly")]
    pub yearly_cycle_days: i64,
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            monthly_cycle_days: default_monthly(),
            yearly_cycle_days: default_yearly(),
        }
    }
}

fn default_monthly() -> i64 {
    30
}

fn default_yearly() -> i64 {
    365
}
