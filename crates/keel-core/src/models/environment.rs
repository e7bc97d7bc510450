//! Environment domain model.
//!
//! Environments live inside exactly one organization and own the API
//! estate: apis, applications, plans, pages, groups and so on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    /// The organization this environment belongs to.
    pub organization_id: String,
    pub cockpit_id: Option<String>,
    pub hrids: Vec<String>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnvironment {
    pub id: Option<String>,
    pub organization_id: String,
    pub cockpit_id: Option<String>,
    pub hrids: Vec<String>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateEnvironment {
    pub cockpit_id: Option<String>,
    pub hrids: Option<Vec<String>>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}
