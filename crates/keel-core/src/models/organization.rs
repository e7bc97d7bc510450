//! Organization domain model.
//!
//! Organizations are the aggregate roots of the tenant hierarchy. They own
//! environments, users, roles and the organization-level settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant organization, mirrored from the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Local identifier.
    pub id: String,
    /// Identifier issued by the controller; used to find the local record.
    pub cockpit_id: Option<String>,
    /// Human-readable identifiers (e.g., `acme`).
    pub hrids: Vec<String>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    /// Local id to use; a fresh one is minted when absent.
    pub id: Option<String>,
    pub cockpit_id: Option<String>,
    pub hrids: Vec<String>,
    pub name: String,
    pub description: Option<String>,
}

/// Fields that can be updated on an existing organization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrganization {
    pub cockpit_id: Option<String>,
    pub hrids: Option<Vec<String>>,
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}
