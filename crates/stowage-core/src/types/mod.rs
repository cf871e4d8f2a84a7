//! Core type definitions used across the Stowage workspace.

pub mod pagination;
pub mod settings;

pub use pagination::PageRequest;
pub use settings::{ObjectStoreSettings, StorageMode, StorageSettings};
