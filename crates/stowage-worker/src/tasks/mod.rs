//! Built-in scheduled tasks.

pub mod rate_limit;
pub mod reconcile;

pub use rate_limit::RateLimitPurgeTask;
pub use reconcile::UsageReconcileTask;
