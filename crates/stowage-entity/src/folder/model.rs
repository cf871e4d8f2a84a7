//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Name given to every per-owner root folder.
pub const ROOT_FOLDER_NAME: &str = "Root";

/// A folder in an owner's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// The organization (tenant) that owns the tree.
    pub organization_id: Uuid,
    /// The user whose subtree this folder belongs to.
    pub owner_id: Uuid,
    /// Parent folder ID (null for the owner's root).
    pub parent_id: Option<Uuid>,
    /// Normalized folder name.
    pub name: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether the folder is live (not soft-deleted).
    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }
}
