//! # stowage-core
//!
//! Core crate for Stowage, the multi-tenant storage quota and folder-tree
//! engine. Contains the unified error system, configuration schemas,
//! storage settings types, pagination, and the traits implemented by the
//! storage and database crates.
//!
//! This crate has **no** internal dependencies on other Stowage crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind, LimitBreach};
pub use result::AppResult;
