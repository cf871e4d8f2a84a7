//! Periodic rebuild of the cached usage counters.

use std::sync::Arc;

use async_trait::async_trait;
use stowage_service::usage::UsageService;

use crate::task::{ScheduledTask, TaskError};

/// Recomputes every organization's usage counter from its live files.
#[derive(Debug)]
pub struct UsageReconcileTask {
    /// Usage cache.
    usage: Arc<UsageService>,
}

impl UsageReconcileTask {
    /// Creates a new reconcile task.
    pub fn new(usage: Arc<UsageService>) -> Self {
        Self { usage }
    }
}

#[async_trait]
impl ScheduledTask for UsageReconcileTask {
    fn name(&self) -> &str {
        "usage_reconcile"
    }

    async fn run(&self) -> Result<String, TaskError> {
        let reports = self.usage.rebuild_all().await?;
        let corrected = reports.iter().filter(|r| r.drift() != 0).count();
        Ok(format!(
            "{} organizations reconciled, {} corrected",
            reports.len(),
            corrected
        ))
    }
}
