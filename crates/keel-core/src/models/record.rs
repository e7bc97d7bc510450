//! Generic owned record.
//!
//! Most collections an environment or organization owns (apis, plans,
//! pages, flows, ...) matter to the control plane only as things to stop
//! or delete. They share this shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::reference::{Collection, Reference};

/// Lifecycle state of a runnable record (api, dictionary).
pub const STATE_STARTED: &str = "STARTED";
pub const STATE_STOPPED: &str = "STOPPED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedRecord {
    pub id: String,
    pub collection: Collection,
    pub reference: Reference,
    pub name: Option<String>,
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOwnedRecord {
    /// Local id to use; a fresh one is minted when absent.
    pub id: Option<String>,
    pub reference: Reference,
    pub name: Option<String>,
    pub state: Option<String>,
}

impl CreateOwnedRecord {
    pub fn new(reference: Reference) -> Self {
        Self {
            id: None,
            reference,
            name: None,
            state: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}
