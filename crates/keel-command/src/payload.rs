//! Typed views of the command payloads.
//!
//! Field names are `snake_case` on the wire. Optional collections default
//! to empty, except `access_points`, whose absence means "leave as is".

use keel_core::models::access_point::NewAccessPoint;
use keel_core::models::reference::ReferenceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPayload {
    /// Local id to create the organization with.
    #[serde(default)]
    pub id: Option<String>,
    pub cockpit_id: String,
    #[serde(default)]
    pub hrids: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub access_points: Option<Vec<NewAccessPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub cockpit_id: String,
    /// Local id of the owning organization.
    pub organization_id: String,
    #[serde(default)]
    pub hrids: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub access_points: Option<Vec<NewAccessPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    /// Controller-side user id, stored as the user's `source_id`.
    pub id: String,
    pub organization_id: String,
    /// Overrides the configured sync source.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPayload {
    /// Controller-side user id of the member.
    pub user_id: String,
    pub organization_id: String,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    /// Remote role name, e.g. `ENVIRONMENT_PRIMARY_OWNER`.
    pub role: String,
}

/// Which fixed role pair a provisioned token user receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenScope {
    /// Kubernetes operator: administers the organization, publishes apis.
    Gko,
    /// Gateway bridge: plain member on both levels.
    Gateway,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetTokenPayload {
    /// Controller-side id of the user to provision.
    pub id: String,
    pub organization_id: String,
    pub environment_id: String,
    pub scope: TokenScope,
    #[serde(default)]
    pub name: Option<String>,
}

/// Payload of the delete and disable commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatePayload {
    /// Controller-side id of the organization or environment.
    pub id: String,
}
