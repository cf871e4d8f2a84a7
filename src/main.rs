//! Stowage daemon: storage quota, usage accounting and folder-tree engine.
//!
//! Wires all crates together, runs migrations, seeds the storage settings,
//! and runs the maintenance scheduler until shutdown.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use stowage_core::config::AppConfig;
use stowage_core::config::logging::LoggingConfig;
use stowage_core::error::AppError;
use stowage_database::DatabasePool;
use stowage_database::migration::run_migrations;
use stowage_database::repositories::StorageSettingsRepository;
use stowage_service::Engine;
use stowage_worker::CronScheduler;

#[tokio::main]
async fn main() {
    let env = std::env::var("STOWAGE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Daemon error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main daemon run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Stowage v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.storage.local.root_path)
        .await
        .map_err(|e| {
            AppError::configuration(format!(
                "Failed to create storage root '{}': {e}",
                config.storage.local.root_path
            ))
        })?;

    let db = DatabasePool::connect(&config.database).await?;
    run_migrations(db.pool()).await?;

    let settings = StorageSettingsRepository::new(db.pool().clone())
        .bootstrap(config.storage.bootstrap.mode, &config.storage.bootstrap.object)
        .await?;
    tracing::info!(
        mode = %settings.mode,
        version = settings.version,
        "Storage settings in effect"
    );

    let storage = Engine::storage_from_config(db.pool(), &config).await?;
    let backend = storage.current_backend().await?;
    tracing::info!(backend = %backend.kind(), "Storage backend selected");

    let engine = Engine::build(db.pool().clone(), &config, storage);

    let mut scheduler = if config.worker.enabled {
        let scheduler = CronScheduler::new().await?;
        scheduler.register_default_tasks(&engine, &config.worker).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Worker disabled; no scheduled tasks");
        None
    };

    tracing::info!("Stowage is running");
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping...");

    if let Some(scheduler) = scheduler.as_mut() {
        match tokio::time::timeout(Duration::from_secs(30), scheduler.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Scheduler shutdown failed"),
            Err(_) => tracing::warn!("Scheduler did not stop within 30s"),
        }
    }

    db.close().await;
    tracing::info!("Stowage shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
