//! Core traits defined in `stowage-core` and implemented by other crates.

pub mod settings;
pub mod storage;

pub use settings::SettingsSource;
pub use storage::{ByteStream, StorageProvider};
