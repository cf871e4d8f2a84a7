//! Scheduled maintenance for Stowage.
//!
//! This crate provides:
//! - A cron scheduler that drives periodic tasks
//! - The usage reconciliation sweep, which rebuilds every cached counter
//! - Eviction of expired upload rate-limit windows

pub mod scheduler;
pub mod task;
pub mod tasks;

pub use scheduler::{CronScheduler, run_task};
pub use task::{ScheduledTask, TaskError};
