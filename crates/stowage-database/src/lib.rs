//! # stowage-database
//!
//! SQLite connection management, embedded migrations, and concrete
//! repository implementations for all Stowage entities.
//!
//! Repository methods that must run inside a caller's transaction take a
//! `&mut SqliteConnection`; pass `&mut *tx` from a [`sqlx::Transaction`].

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
