//! Fixed-window upload rate limiter, per user and per organization.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use stowage_core::config::rate_limit::RateLimitConfig;
use stowage_core::error::AppError;
use stowage_core::result::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Subject {
    User(Uuid),
    Organization(Uuid),
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window counters for upload admission.
#[derive(Debug, Clone)]
pub struct UploadRateLimiter {
    /// Subject → current window.
    windows: Arc<Mutex<HashMap<Subject, Window>>>,
    /// Limits.
    config: RateLimitConfig,
}

impl UploadRateLimiter {
    /// Creates a new rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Count one upload for the user and the organization, or reject it.
    pub async fn check(&self, user_id: Uuid, organization_id: Uuid) -> AppResult<()> {
        self.check_at(user_id, organization_id, Instant::now()).await
    }

    /// [`check`](Self::check) at a given instant.
    ///
    /// Nothing is counted when either window is exhausted.
    pub async fn check_at(&self, user_id: Uuid, organization_id: Uuid, now: Instant) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let window = Duration::from_secs(self.config.window_seconds.max(1));
        let subjects = [
            (Subject::User(user_id), self.config.uploads_per_user),
            (Subject::Organization(organization_id), self.config.uploads_per_organization),
        ];

        let mut windows = self.windows.lock().await;
        for (subject, limit) in subjects {
            let current = windows.entry(subject).or_insert(Window {
                started: now,
                count: 0,
            });
            if now.duration_since(current.started) >= window {
                *current = Window {
                    started: now,
                    count: 0,
                };
            }
            if current.count >= limit {
                warn!(subject = ?subject, limit, "Upload rate limit reached");
                return Err(AppError::rate_limited(match subject {
                    Subject::User(_) => "Too many uploads; try again shortly",
                    Subject::Organization(_) => {
                        "Too many uploads for this organization; try again shortly"
                    }
                }));
            }
        }
        for (subject, _) in subjects {
            if let Some(current) = windows.get_mut(&subject) {
                current.count += 1;
            }
        }
        Ok(())
    }

    /// Drop windows that ended before `now`.
    pub async fn purge_expired(&self, now: Instant) {
        let window = Duration::from_secs(self.config.window_seconds.max(1));
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started) < window);
    }
}
