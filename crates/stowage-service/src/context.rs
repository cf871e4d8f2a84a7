//! Principal and explorer context carrying who is acting and on whose subtree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stowage_core::error::AppError;
use stowage_core::result::AppResult;
use stowage_entity::subscription::AccessState;
use stowage_entity::user::Role;

/// An authenticated caller, as resolved by the surrounding platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// The organization the user acts within.
    pub organization_id: Uuid,
    /// The user's role.
    pub role: Role,
}

impl Principal {
    /// Creates a new principal.
    pub fn new(user_id: Uuid, organization_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            organization_id,
            role,
        }
    }

    /// Reject platform operators, who must not see tenant file contents.
    pub fn require_tenant_role(&self) -> AppResult<()> {
        if self.role == Role::SaasAdmin {
            return Err(AppError::permission_denied(
                "Platform administrators cannot access tenant storage",
            ));
        }
        Ok(())
    }
}

/// Context for one explorer operation.
///
/// Built by [`ExplorerService::resolve_context`](crate::ExplorerService::resolve_context)
/// and passed into every explorer method so that each operation knows
/// who is acting and what the organization's subscription allows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerContext {
    /// The acting user.
    pub user_id: Uuid,
    /// The tenant.
    pub organization_id: Uuid,
    /// The acting user's role.
    pub role: Role,
    /// Subscription state at the time the context was resolved.
    pub access: AccessState,
    /// When the context was resolved.
    pub resolved_at: DateTime<Utc>,
}

impl ExplorerContext {
    /// Build a context for a principal. Platform operators are refused.
    pub fn new(principal: &Principal, access: AccessState) -> AppResult<Self> {
        principal.require_tenant_role()?;
        Ok(Self {
            user_id: principal.user_id,
            organization_id: principal.organization_id,
            role: principal.role,
            access,
            resolved_at: Utc::now(),
        })
    }

    /// Whether the caller may act across every owner in the organization.
    pub fn is_admin(&self) -> bool {
        self.role.is_org_admin()
    }

    /// Reject unless reads are allowed.
    pub fn require_read(&self) -> AppResult<()> {
        if self.access.can_read() {
            Ok(())
        } else {
            Err(AppError::permission_denied(
                "The organization has no storage subscription",
            ))
        }
    }

    /// Reject unless writes are allowed.
    pub fn require_write(&self) -> AppResult<()> {
        self.require_read()?;
        if self.access.can_write() {
            Ok(())
        } else {
            Err(AppError::read_only())
        }
    }

    /// Reject unless the caller may address `owner_id`'s subtree in `organization_id`.
    pub fn require_owner(&self, organization_id: Uuid, owner_id: Uuid) -> AppResult<()> {
        if organization_id != self.organization_id {
            return Err(AppError::permission_denied(
                "Resource belongs to another organization",
            ));
        }
        if owner_id != self.user_id && !self.is_admin() {
            return Err(AppError::permission_denied(
                "Resource belongs to another user",
            ));
        }
        Ok(())
    }

    /// The owner a request addresses: admins may pick one, everyone else gets themselves.
    pub fn target_owner(&self, requested: Option<Uuid>) -> AppResult<Uuid> {
        match requested {
            Some(owner) => {
                self.require_owner(self.organization_id, owner)?;
                Ok(owner)
            }
            None => Ok(self.user_id),
        }
    }
}
