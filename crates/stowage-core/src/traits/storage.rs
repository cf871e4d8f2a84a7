//! Storage provider trait for file storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for file storage backends.
///
/// Implementations exist for the local filesystem and S3-compatible
/// object storage. Keys are opaque `/`-separated strings produced by the
/// storage key builder.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "object").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Open an object and return its byte stream.
    async fn read(&self, key: &str) -> AppResult<ByteStream>;

    /// Read an object into memory.
    async fn read_bytes(&self, key: &str) -> AppResult<Bytes>;

    /// Durably write bytes under the given key.
    async fn write(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Delete the object under the given key. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Size of the stored object in bytes.
    async fn size(&self, key: &str) -> AppResult<u64>;

    /// A URL from which the object can be fetched.
    async fn url(&self, key: &str) -> AppResult<String>;
}
