//! Scheduled task trait and error type.

use async_trait::async_trait;

use stowage_core::error::AppError;

/// A unit of periodic work driven by the cron scheduler.
#[async_trait]
pub trait ScheduledTask: Send + Sync + std::fmt::Debug {
    /// Stable task name used in logs.
    fn name(&self) -> &str;

    /// Run the task once, returning a one-line summary.
    async fn run(&self) -> Result<String, TaskError>;
}

/// Error from a task run.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task could not run at all.
    #[error("Task failed: {0}")]
    Failed(#[from] AppError),
}
