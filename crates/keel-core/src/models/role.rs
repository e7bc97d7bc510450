//! Role domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeelError;

/// What kind of entity a role grants rights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleScope {
    Organization,
    Environment,
    Api,
    Application,
    Group,
    Integration,
}

impl RoleScope {
    pub const ALL: &'static [RoleScope] = &[
        RoleScope::Organization,
        RoleScope::Environment,
        RoleScope::Api,
        RoleScope::Application,
        RoleScope::Group,
        RoleScope::Integration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "ORGANIZATION",
            Self::Environment => "ENVIRONMENT",
            Self::Api => "API",
            Self::Application => "APPLICATION",
            Self::Group => "GROUP",
            Self::Integration => "INTEGRATION",
        }
    }
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleScope {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| KeelError::Validation {
                message: format!("unknown role scope: {s}"),
            })
    }
}

/// A named set of rights, defined per organization and scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub organization_id: String,
    pub scope: RoleScope,
    pub name: String,
    pub description: Option<String>,
    /// Assigned to new members when no role is given.
    pub default_role: bool,
    /// Built-in role that cannot be edited.
    pub system: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub organization_id: String,
    pub scope: RoleScope,
    pub name: String,
    pub description: Option<String>,
    pub default_role: bool,
    pub system: bool,
}
