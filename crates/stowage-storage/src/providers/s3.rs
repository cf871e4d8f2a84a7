//! S3-compatible object storage provider.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use stowage_core::error::AppError;
use stowage_core::result::AppResult;
use stowage_core::traits::storage::{ByteStream, StorageProvider};
use stowage_core::types::settings::ObjectStoreSettings;

/// Client tuning shared by every object provider instance.
#[derive(Debug, Clone, Copy)]
pub struct S3ProviderOptions {
    /// Maximum attempts per request, including the first.
    pub max_attempts: u32,
    /// Lifetime of presigned download URLs.
    pub presigned_ttl: Duration,
}

impl Default for S3ProviderOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            presigned_ttl: Duration::from_secs(3600),
        }
    }
}

/// S3-compatible storage provider.
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
    presigned_ttl: Duration,
}

impl S3StorageProvider {
    /// Create a new S3 storage provider from static credentials.
    ///
    /// Building the client performs no network I/O; connectivity problems
    /// surface on the first request.
    pub fn new(settings: &ObjectStoreSettings, options: S3ProviderOptions) -> AppResult<Self> {
        if !settings.is_complete() {
            return Err(AppError::configuration(
                "Object storage requires a bucket, access key, and secret key",
            ));
        }

        info!(
            endpoint = %settings.endpoint,
            region = %settings.region,
            bucket = %settings.bucket,
            "Initializing S3 storage provider"
        );

        let credentials = Credentials::new(
            settings.access_key.trim(),
            settings.secret_key.trim(),
            None,
            None,
            "stowage-settings",
        );
        let region = if settings.region.trim().is_empty() {
            "us-east-1".to_string()
        } else {
            settings.region.trim().to_string()
        };

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::standard().with_max_attempts(options.max_attempts.max(1)))
            .force_path_style(true);
        if !settings.endpoint.trim().is_empty() {
            builder = builder.endpoint_url(settings.endpoint.trim());
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket.trim().to_string(),
            presigned_ttl: options.presigned_ttl,
        })
    }

    /// The bucket this provider writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn sdk_error(action: &str, key: &str, err: impl std::error::Error) -> AppError {
    AppError::storage_unavailable(format!(
        "Object storage {action} failed for {key}: {}",
        DisplayErrorContext(err)
    ))
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "object"
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| true)
            .map_err(|e| sdk_error("health check", &self.bucket, e))
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("File not found: {key}"))
                } else {
                    sdk_error("read", key, e)
                }
            })?;

        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }

    async fn read_bytes(&self, key: &str) -> AppResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("File not found: {key}"))
                } else {
                    sdk_error("read", key, e)
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| sdk_error("read body", key, e))?;
        Ok(data.into_bytes())
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(i64::try_from(len).unwrap_or(i64::MAX))
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| sdk_error("write", key, e))?;

        debug!(key, bytes = len, bucket = %self.bucket, "Wrote object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("delete", key, e))?;

        debug!(key, bucket = %self.bucket, "Deleted object");
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(sdk_error("stat", key, e)),
        }
    }

    async fn size(&self, key: &str) -> AppResult<u64> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    AppError::not_found(format!("File not found: {key}"))
                } else {
                    sdk_error("stat", key, e)
                }
            })?;

        Ok(output
            .content_length()
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or(0))
    }

    async fn url(&self, key: &str) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(self.presigned_ttl)
            .map_err(|e| AppError::configuration(format!("Invalid presigned URL lifetime: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| sdk_error("presign", key, e))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ObjectStoreSettings {
        ObjectStoreSettings {
            endpoint: "http://127.0.0.1:9000".into(),
            region: "us-east-1".into(),
            bucket: "media".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
        }
    }

    #[test]
    fn test_incomplete_credentials_are_rejected() {
        let mut incomplete = settings();
        incomplete.secret_key.clear();
        let err = S3StorageProvider::new(&incomplete, S3ProviderOptions::default()).unwrap_err();
        assert_eq!(err.kind, stowage_core::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_presigned_url_targets_bucket_and_key() {
        let provider = S3StorageProvider::new(&settings(), S3ProviderOptions::default()).unwrap();
        let url = provider.url("media-storage/a/b.txt").await.unwrap();
        assert!(url.starts_with("http://127.0.0.1:9000/media/media-storage/a/b.txt?"));
        assert!(url.contains("X-Amz-Signature="));
    }
}
