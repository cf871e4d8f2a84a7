//! Storage plan entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A purchasable storage plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Plan {
    /// Unique plan identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Base storage allowance in GB.
    pub storage_gb: i64,
    /// Monthly bandwidth allowance in GB.
    pub bandwidth_limit_gb_monthly: i64,
    /// Whether the bandwidth allowance is enforced.
    pub is_bandwidth_limited: bool,
    /// Maximum seats.
    pub max_users: i64,
}
