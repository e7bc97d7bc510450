//! Personal access token model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored token. Only the SHA-256 hash of the raw value is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateToken {
    pub user_id: String,
    pub name: String,
    pub token_hash: String,
}
