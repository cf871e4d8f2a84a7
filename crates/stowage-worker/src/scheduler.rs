//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;
use std::time::Instant;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use stowage_core::config::worker::WorkerConfig;
use stowage_core::error::AppError;
use stowage_core::result::AppResult;
use stowage_service::Engine;

use crate::task::{ScheduledTask, TaskError};
use crate::tasks::{RateLimitPurgeTask, UsageReconcileTask};

/// Schedule for evicting expired rate-limit windows: every five minutes.
const RATE_LIMIT_PURGE_CRON: &str = "0 */5 * * * *";

/// Cron-based scheduler for periodic background tasks.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self { scheduler })
    }

    /// Register the reconciliation sweep and the rate-limit purge.
    pub async fn register_default_tasks(&self, engine: &Engine, config: &WorkerConfig) -> AppResult<()> {
        self.register(
            &config.reconcile_cron,
            Arc::new(UsageReconcileTask::new(Arc::clone(&engine.usage))),
        )
        .await?;
        self.register(
            RATE_LIMIT_PURGE_CRON,
            Arc::new(RateLimitPurgeTask::new(engine.explorer.rate_limiter().clone())),
        )
        .await?;

        info!("All scheduled tasks registered");
        Ok(())
    }

    /// Run `task` on a six-field cron `schedule`.
    pub async fn register(&self, schedule: &str, task: Arc<dyn ScheduledTask>) -> AppResult<()> {
        let name = task.name().to_string();
        let scheduled = Arc::clone(&task);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let task = Arc::clone(&scheduled);
            Box::pin(async move {
                // Failures are logged inside; the next tick retries.
                let _ = run_task(task.as_ref()).await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {name}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        info!(task = %name, schedule, "Registered scheduled task");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }
}

/// Run a task once and log how it went.
pub async fn run_task(task: &dyn ScheduledTask) -> Result<String, TaskError> {
    debug!(task = task.name(), "Running scheduled task");
    let started = Instant::now();
    match task.run().await {
        Ok(summary) => {
            info!(
                task = task.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                summary = %summary,
                "Scheduled task finished"
            );
            Ok(summary)
        }
        Err(e) => {
            error!(task = task.name(), error = %e, "Scheduled task failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::config::AppConfig;
    use stowage_core::error::ErrorKind;
    use stowage_database::DatabasePool;
    use stowage_database::migration::run_migrations;
    use stowage_database::repositories::OrganizationRepository;
    use stowage_storage::SettingsHandle;

    async fn engine(dir: &tempfile::TempDir) -> Engine {
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("stowage.db").display());
        config.storage.local.root_path = dir.path().join("objects").display().to_string();

        let pool = DatabasePool::connect(&config.database).await.unwrap().into_pool();
        run_migrations(&pool).await.unwrap();
        let storage = Engine::storage_with_settings(Arc::new(SettingsHandle::default()), &config)
            .await
            .unwrap();
        Engine::build(pool, &config, storage)
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir).await;
        let scheduler = CronScheduler::new().await.unwrap();

        let err = scheduler
            .register(
                "not a cron line",
                Arc::new(UsageReconcileTask::new(Arc::clone(&engine.usage))),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(
            scheduler
                .register_default_tasks(&engine, &WorkerConfig::default())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_reconcile_task_repairs_drift() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir).await;
        let org = OrganizationRepository::new(engine.pool.clone())
            .create("Acme")
            .await
            .unwrap()
            .id;
        engine.usage.increment(org, 99).await.unwrap();

        let task = UsageReconcileTask::new(Arc::clone(&engine.usage));
        let summary = run_task(&task).await.unwrap();
        assert!(summary.ends_with("1 corrected"), "{summary}");
        assert_eq!(engine.usage.get(org).await.unwrap().used(), 0);

        let summary = run_task(&task).await.unwrap();
        assert!(summary.ends_with("0 corrected"), "{summary}");
    }
}
