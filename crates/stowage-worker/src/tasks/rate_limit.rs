//! Eviction of expired upload rate-limit windows.

use std::time::Instant;

use async_trait::async_trait;

use stowage_service::rate_limit::UploadRateLimiter;

use crate::task::{ScheduledTask, TaskError};

/// Drops rate-limit windows that have already ended.
#[derive(Debug)]
pub struct RateLimitPurgeTask {
    limiter: UploadRateLimiter,
}

impl RateLimitPurgeTask {
    /// Creates a purge task over a shared limiter.
    pub fn new(limiter: UploadRateLimiter) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl ScheduledTask for RateLimitPurgeTask {
    fn name(&self) -> &str {
        "rate_limit_purge"
    }

    async fn run(&self) -> Result<String, TaskError> {
        self.limiter.purge_expired(Instant::now()).await;
        Ok("expired windows purged".to_string())
    }
}
