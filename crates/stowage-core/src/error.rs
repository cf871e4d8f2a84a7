//! Unified application error types for Stowage.
//!
//! Quota, permission, and naming outcomes are ordinary values of
//! [`AppError`] returned through `Result`; only backend I/O faults that
//! survive the fallback policy surface as [`ErrorKind::StorageUnavailable`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind categorization used across the entire engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An upload would exceed the organization's total allowed bytes.
    StorageLimitExceeded,
    /// Serving bytes would exceed the monthly bandwidth allowance.
    BandwidthLimitExceeded,
    /// A folder or file name collides with a live sibling.
    DuplicateName,
    /// A move would create a cycle or is otherwise not allowed.
    InvalidMove,
    /// The principal may not access the addressed subtree.
    PermissionDenied,
    /// Backend I/O failed and no fallback was possible.
    StorageUnavailable,
    /// The organization's subscription lapsed; writes are rejected.
    ReadOnly,
    /// The upload exceeds the per-file size ceiling.
    FileTooLarge,
    /// The upload carries a blocked (executable) extension.
    BlockedFileType,
    /// The upload content type is not on the allow-list.
    InvalidContentType,
    /// An upload rate limit window is exhausted.
    RateLimited,
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StorageLimitExceeded => "storage_limit_exceeded",
            Self::BandwidthLimitExceeded => "bandwidth_limit_exceeded",
            Self::DuplicateName => "duplicate_name",
            Self::InvalidMove => "invalid_move",
            Self::PermissionDenied => "permission_denied",
            Self::StorageUnavailable => "storage_unavailable",
            Self::ReadOnly => "read_only",
            Self::FileTooLarge => "file_too_large",
            Self::BlockedFileType => "blocked_file_type",
            Self::InvalidContentType => "invalid_content_type",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Database => "database_error",
            Self::Configuration => "configuration_error",
            Self::Serialization => "serialization_error",
            Self::Internal => "internal_error",
        }
    }

    /// Whether retrying the same operation later may succeed without any
    /// change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable | Self::Database)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code().to_ascii_uppercase())
    }
}

/// Usage figures attached to a limit rejection, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitBreach {
    /// Bytes already consumed.
    pub used: u64,
    /// Bytes allowed.
    pub limit: u64,
}

/// The unified application error used throughout Stowage.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Usage figures for limit rejections.
    pub breach: Option<LimitBreach>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            breach: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            breach: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage-limit rejection carrying the current usage.
    pub fn storage_limit_exceeded(used: u64, limit: u64) -> Self {
        Self {
            breach: Some(LimitBreach { used, limit }),
            ..Self::new(
                ErrorKind::StorageLimitExceeded,
                format!("Storage limit exceeded: {used} of {limit} bytes used"),
            )
        }
    }

    /// Create a bandwidth-limit rejection carrying the current cycle usage.
    pub fn bandwidth_limit_exceeded(used: u64, limit: u64) -> Self {
        Self {
            breach: Some(LimitBreach { used, limit }),
            ..Self::new(
                ErrorKind::BandwidthLimitExceeded,
                format!("Bandwidth limit exceeded: {used} of {limit} bytes used this cycle"),
            )
        }
    }

    /// Create a duplicate-name error.
    pub fn duplicate_name(name: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateName,
            format!("An item named '{name}' already exists here"),
        )
    }

    /// Create an invalid-move error.
    pub fn invalid_move(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMove, message)
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Create a storage-unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageUnavailable, message)
    }

    /// Create a read-only error.
    pub fn read_only() -> Self {
        Self::new(
            ErrorKind::ReadOnly,
            "Storage subscription is inactive; the organization is read-only",
        )
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a rate-limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Stable machine-readable code of this error.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            breach: self.breach,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(
            ErrorKind::StorageUnavailable,
            format!("I/O error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_snake_case() {
        assert_eq!(
            ErrorKind::StorageLimitExceeded.code(),
            "storage_limit_exceeded"
        );
        assert_eq!(ErrorKind::BlockedFileType.code(), "blocked_file_type");
        assert_eq!(ErrorKind::StorageUnavailable.to_string(), "STORAGE_UNAVAILABLE");
    }

    #[test]
    fn test_limit_breach_is_carried() {
        let err = AppError::storage_limit_exceeded(5, 10);
        assert_eq!(err.kind, ErrorKind::StorageLimitExceeded);
        assert_eq!(err.breach, Some(LimitBreach { used: 5, limit: 10 }));
        assert_eq!(err.clone().breach, err.breach);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::StorageUnavailable.is_retryable());
        assert!(!ErrorKind::StorageLimitExceeded.is_retryable());
        assert!(!ErrorKind::PermissionDenied.is_retryable());
    }
}
