//! Organization (tenant) entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A tenant: the unit of billing and quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    /// Unique organization identifier.
    pub id: Uuid,
    /// Display name, used to build storage keys.
    pub name: String,
    /// When the organization was created.
    pub created_at: DateTime<Utc>,
}
