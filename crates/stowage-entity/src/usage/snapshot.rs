//! Usage value objects reported to callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage usage against the organization's total allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Currently used bytes.
    pub used_bytes: u64,
    /// Total allowed bytes (zero when no plan is active).
    pub limit_bytes: u64,
    /// Remaining bytes.
    pub available_bytes: u64,
    /// Usage percentage (0.0 - 100.0+).
    pub usage_percent: f64,
}

impl UsageSnapshot {
    /// Create a snapshot from used and limit values.
    pub fn new(used_bytes: u64, limit_bytes: u64) -> Self {
        let usage_percent = if limit_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / limit_bytes as f64) * 100.0
        };

        Self {
            used_bytes,
            limit_bytes,
            available_bytes: limit_bytes.saturating_sub(used_bytes),
            usage_percent,
        }
    }

    /// Check if adding the given number of bytes would exceed the limit.
    ///
    /// A zero limit never admits anything, not even an empty file.
    pub fn would_exceed(&self, additional_bytes: u64) -> bool {
        self.limit_bytes == 0
            || self.used_bytes.saturating_add(additional_bytes) > self.limit_bytes
    }
}

/// Bandwidth usage for the current billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthSnapshot {
    /// First day of the cycle.
    pub cycle_start: NaiveDate,
    /// Bytes served so far this cycle.
    pub used_bytes: u64,
    /// Monthly allowance in bytes (zero when unlimited).
    pub limit_bytes: u64,
    /// Whether the allowance is enforced.
    pub is_limited: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_boundary() {
        let snap = UsageSnapshot::new(7, 10);
        assert_eq!(snap.available_bytes, 3);
        assert!(!snap.would_exceed(3));
        assert!(snap.would_exceed(4));
    }

    #[test]
    fn test_zero_limit_fails_closed() {
        let snap = UsageSnapshot::new(0, 0);
        assert!(snap.would_exceed(0));
        assert!(snap.would_exceed(1));
        assert_eq!(snap.usage_percent, 0.0);
    }

    #[test]
    fn test_over_limit_has_no_availability() {
        let snap = UsageSnapshot::new(12, 10);
        assert_eq!(snap.available_bytes, 0);
        assert!(snap.usage_percent > 100.0);
    }
}
