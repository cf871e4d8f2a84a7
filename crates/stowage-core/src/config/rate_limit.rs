//! Upload rate limiting configuration.

use serde::{Deserialize, Serialize};

/// Fixed-window upload throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether upload throttling is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Window length in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    /// Uploads allowed per user per window.
    #[serde(default = "default_per_user")]
    pub uploads_per_user: u32,
    /// Uploads allowed per organization per window.
    #[serde(default = "default_per_org")]
    pub uploads_per_organization: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: default_window(),
            uploads_per_user: default_per_user(),
            uploads_per_organization: default_per_org(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_window() -> u64 {
    60
}

fn default_per_user() -> u32 {
    30
}

fn default_per_org() -> u32 {
    300
}
