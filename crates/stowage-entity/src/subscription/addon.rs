//! Purchased storage add-on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Extra storage slots stacked on top of a plan's base allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AddonPurchase {
    /// Unique purchase identifier.
    pub id: Uuid,
    /// The purchasing organization.
    pub organization_id: Uuid,
    /// Storage granted per slot, in GB.
    pub storage_gb: i64,
    /// Number of slots purchased.
    pub quantity: i64,
    /// Whether the purchase is still in force.
    pub is_active: bool,
    /// When the purchase was made.
    pub created_at: DateTime<Utc>,
}

impl AddonPurchase {
    /// Total GB granted by this purchase.
    pub fn total_gb(&self) -> i64 {
        self.storage_gb.max(0) * self.quantity.max(0)
    }
}
