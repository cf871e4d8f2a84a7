//! Role enumeration for explorer principals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a resolved principal can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Administrator of one organization; may act on every owner in it.
    OrgAdmin,
    /// Regular member; may act only on their own subtree.
    OrgUser,
    /// Platform operator; barred from tenant file contents.
    SaasAdmin,
}

impl Role {
    /// Check if this role may act across owners of its organization.
    pub fn is_org_admin(&self) -> bool {
        matches!(self, Self::OrgAdmin)
    }

    /// Return the role as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrgAdmin => "org_admin",
            Self::OrgUser => "org_user",
            Self::SaasAdmin => "saas_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "org_admin" => Ok(Self::OrgAdmin),
            "org_user" => Ok(Self::OrgUser),
            "saas_admin" => Ok(Self::SaasAdmin),
            _ => Err(format!("Invalid role: '{s}'")),
        }
    }
}
