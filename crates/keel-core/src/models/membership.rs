//! Membership domain model.
//!
//! A membership grants a member (user or group) one role on a referenced
//! entity. A member may hold several memberships on the same reference.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KeelError;
use crate::models::reference::Reference;
use crate::models::role::{Role, RoleScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberType {
    User,
    Group,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Group => "GROUP",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "GROUP" => Ok(Self::Group),
            other => Err(KeelError::Validation {
                message: format!("unknown member type: {other}"),
            }),
        }
    }
}

/// The principal side of a membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub member_type: MemberType,
    pub member_id: String,
}

impl Member {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            member_type: MemberType::User,
            member_id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub reference: Reference,
    pub member: Member,
    pub role_id: String,
    pub role_scope: RoleScope,
    pub role_name: String,
    /// Where the grant came from (e.g., `cockpit`).
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub reference: Reference,
    pub member: Member,
    pub role_id: String,
    pub role_scope: RoleScope,
    pub role_name: String,
    pub source: Option<String>,
}

impl CreateMembership {
    pub fn new(reference: Reference, member: Member, role: &Role) -> Self {
        Self {
            reference,
            member,
            role_id: role.id.clone(),
            role_scope: role.scope,
            role_name: role.name.clone(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
