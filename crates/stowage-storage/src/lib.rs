//! # stowage-storage
//!
//! Storage backends for Stowage: the local filesystem and S3-compatible
//! object stores, the [`Backend`] union over them, and [`DynamicStorage`],
//! which picks a backend per call from the current admin settings and
//! falls back to local storage when the object store is not the intended
//! target.

pub mod backend;
pub mod dynamic;
pub mod key;
pub mod providers;
pub mod settings;

pub use backend::{Backend, ObjectConnector, S3Connector};
pub use dynamic::{DynamicStorage, DynamicStorageOptions};
pub use key::build_storage_key;
pub use settings::SettingsHandle;
