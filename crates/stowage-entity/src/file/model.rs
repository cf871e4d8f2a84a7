//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use stowage_core::types::settings::StorageMode;

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The organization (tenant) that owns the file.
    pub organization_id: Uuid,
    /// The user whose subtree holds the file.
    pub owner_id: Uuid,
    /// The folder containing this file.
    pub folder_id: Uuid,
    /// Normalized original file name (including extension).
    pub original_filename: String,
    /// Opaque key locating the bytes in the storage backend.
    pub storage_key: String,
    /// Backend that accepted the bytes; reads and deletes go there.
    #[sqlx(try_from = "String")]
    pub storage_backend: StorageMode,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type supplied at upload.
    pub content_type: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
}

impl File {
    /// Size in bytes as an unsigned count.
    pub fn size(&self) -> u64 {
        u64::try_from(self.size_bytes).unwrap_or(0)
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = split_extension(&self.original_filename);
        ext.map(|e| e.to_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// The organization.
    pub organization_id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// The folder to place the file in.
    pub folder_id: Uuid,
    /// Normalized file name.
    pub original_filename: String,
    /// Backend key already holding the bytes.
    pub storage_key: String,
    /// Backend the bytes were written to.
    pub storage_backend: StorageMode,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub content_type: String,
}

/// Split `name` into stem and extension at the last dot.
///
/// A leading dot (`.bashrc`) or a trailing dot does not start an extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// The `n`-th disambiguated variant of `name`: `report (2).pdf`.
pub fn numbered_name(name: &str, n: u32) -> String {
    match split_extension(name) {
        (stem, Some(ext)) => format!("{stem} ({n}).{ext}"),
        (stem, None) => format!("{stem} ({n})"),
    }
}
