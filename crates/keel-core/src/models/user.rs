//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A principal known to an organization.
///
/// Users are unique per organization by `(source, source_id)`: the
/// identity provider that vouches for them and that provider's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub source: String,
    pub source_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    /// Values of the organization's custom user fields.
    pub custom_fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Local id to use; a fresh one is minted when absent.
    pub id: Option<String>,
    pub organization_id: String,
    pub source: String,
    pub source_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
}
