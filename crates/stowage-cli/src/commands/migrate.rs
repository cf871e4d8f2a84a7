//! Database migration command.

use stowage_core::config::AppConfig;
use stowage_core::error::AppError;

use crate::output;

/// Apply all pending migrations.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    println!("Running database migrations...");
    let pool = super::connect(config).await?;
    pool.close().await;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
