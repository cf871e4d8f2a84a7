//! Storage provider implementations.

pub mod local;
pub mod s3;

pub use local::LocalStorageProvider;
pub use s3::{S3ProviderOptions, S3StorageProvider};
