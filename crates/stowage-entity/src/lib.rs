//! # stowage-entity
//!
//! Domain entity models for Stowage. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod file;
pub mod folder;
pub mod organization;
pub mod subscription;
pub mod usage;
pub mod user;

/// Bytes in one storage "GB" as sold on plans and add-ons (binary GiB).
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;
