//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression for the usage reconciliation sweep.
    #[serde(default = "default_reconcile_cron")]
    pub reconcile_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconcile_cron: default_reconcile_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reconcile_cron() -> String {
    "0 30 3 * * *".to_string()
}
