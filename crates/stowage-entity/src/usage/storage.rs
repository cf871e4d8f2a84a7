//! Per-organization storage usage cache row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Cached total of bytes consumed by an organization's live files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrgStorageUsage {
    /// The organization.
    pub organization_id: Uuid,
    /// Cached sum of live file sizes.
    pub used_storage_bytes: i64,
    /// When the value was last recomputed from the file table.
    pub last_calculated_at: Option<DateTime<Utc>>,
    /// Bumped on every mutation.
    pub version: i64,
}

impl OrgStorageUsage {
    /// Used bytes as an unsigned count.
    pub fn used(&self) -> u64 {
        u64::try_from(self.used_storage_bytes).unwrap_or(0)
    }
}
