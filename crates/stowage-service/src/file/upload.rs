//! Upload content validation: size ceiling, blocked extensions, content-type allow-list.

use bytes::Bytes;

use stowage_core::config::upload::UploadConfig;
use stowage_core::error::{AppError, ErrorKind};
use stowage_core::result::AppResult;
use stowage_entity::file::split_extension;

use crate::folder::validated_name;

/// Content type recorded when the client sends none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Client-supplied file name, possibly with a path.
    pub filename: String,
    /// Client-supplied MIME type.
    pub content_type: Option<String>,
    /// File content.
    pub data: Bytes,
}

impl IncomingFile {
    /// Creates a new incoming file.
    pub fn new(filename: impl Into<String>, content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The file name without any client path, normalized.
    pub fn sanitized_filename(&self) -> AppResult<String> {
        let base = self
            .filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        validated_name(base)
    }

    /// Lower-cased MIME type without parameters.
    pub fn effective_content_type(&self) -> String {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }
}

/// Validates uploads against the configured rules.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    /// Upload rules.
    config: UploadConfig,
}

impl UploadValidator {
    /// Creates a new validator.
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Check an upload, in order: size ceiling, blocked extension, content type.
    pub fn validate(&self, file: &IncomingFile) -> AppResult<()> {
        if file.size() > self.config.max_upload_size_bytes {
            return Err(AppError::new(
                ErrorKind::FileTooLarge,
                format!(
                    "File is {} bytes; the maximum upload size is {} bytes",
                    file.size(),
                    self.config.max_upload_size_bytes
                ),
            ));
        }

        let name = file.sanitized_filename()?;
        if let (_, Some(ext)) = split_extension(&name) {
            if self.is_blocked_extension(ext) {
                return Err(AppError::new(
                    ErrorKind::BlockedFileType,
                    format!("Files of type '.{}' are not allowed", ext.to_ascii_lowercase()),
                ));
            }
        }

        let content_type = file.effective_content_type();
        if !self.is_allowed_content_type(&content_type) {
            return Err(AppError::new(
                ErrorKind::InvalidContentType,
                format!("Content type '{content_type}' is not allowed"),
            ));
        }
        Ok(())
    }

    fn is_blocked_extension(&self, ext: &str) -> bool {
        self.config
            .blocked_extensions
            .iter()
            .any(|blocked| blocked.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    fn is_allowed_content_type(&self, content_type: &str) -> bool {
        if self.config.allowed_content_types.is_empty() {
            return true;
        }
        self.config.allowed_content_types.iter().any(|allowed| {
            let allowed = allowed.trim().to_ascii_lowercase();
            match allowed.strip_suffix("/*") {
                Some(major) => content_type
                    .split_once('/')
                    .is_some_and(|(m, _)| m == major),
                None => allowed == "*/*" || allowed == content_type,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(allowed: &[&str]) -> UploadValidator {
        UploadValidator::new(UploadConfig {
            max_upload_size_bytes: 10,
            allowed_content_types: allowed.iter().map(|s| (*s).to_string()).collect(),
            ..UploadConfig::default()
        })
    }

    fn kind(result: AppResult<()>) -> Option<ErrorKind> {
        result.err().map(|e| e.kind)
    }

    #[test]
    fn test_size_ceiling() {
        let v = validator(&[]);
        assert!(v.validate(&IncomingFile::new("a.txt", None, vec![0u8; 10])).is_ok());
        assert_eq!(
            kind(v.validate(&IncomingFile::new("a.txt", None, vec![0u8; 11]))),
            Some(ErrorKind::FileTooLarge)
        );
    }

    #[test]
    fn test_blocked_extensions_ignore_case() {
        let v = validator(&[]);
        assert_eq!(
            kind(v.validate(&IncomingFile::new("setup.EXE", None, "x"))),
            Some(ErrorKind::BlockedFileType)
        );
        assert_eq!(
            kind(v.validate(&IncomingFile::new("C:\\tmp\\run.ps1", None, "x"))),
            Some(ErrorKind::BlockedFileType)
        );
        assert!(v.validate(&IncomingFile::new("notes.exe.txt", None, "x")).is_ok());
        assert!(v.validate(&IncomingFile::new(".sh", None, "x")).is_ok());
    }

    #[test]
    fn test_content_type_allow_list_with_wildcards() {
        let v = validator(&["image/*", "application/pdf"]);
        let file = |ct: Option<&str>| IncomingFile::new("f.bin", ct, "x");

        assert!(v.validate(&file(Some("image/png"))).is_ok());
        assert!(v.validate(&file(Some("Application/PDF; charset=binary"))).is_ok());
        assert_eq!(
            kind(v.validate(&file(Some("text/plain")))),
            Some(ErrorKind::InvalidContentType)
        );
        assert_eq!(kind(v.validate(&file(None))), Some(ErrorKind::InvalidContentType));
    }

    #[test]
    fn test_sanitized_filename_strips_client_paths() {
        let file = IncomingFile::new("../../etc/  my   notes.txt", None, "x");
        assert_eq!(file.sanitized_filename().unwrap(), "my notes.txt");
        assert!(IncomingFile::new("dir/", None, "x").sanitized_filename().is_err());
    }
}
