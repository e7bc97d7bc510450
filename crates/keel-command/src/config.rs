//! Handler settings.

use serde::{Deserialize, Serialize};

/// Settings shared by the command handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub token: TokenSettings,
    pub sync: SyncSettings,
}

/// Provisioning saga settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Token name used when the command does not carry one.
    pub default_name: String,
    /// Identity source tag stamped on provisioned users.
    pub source: String,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            default_name: "Cloud Token".into(),
            source: "cloud-token".into(),
        }
    }
}

/// Lifecycle sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Identity source of users mirrored from the controller; also recorded
    /// as the source of the memberships it grants.
    pub source: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            source: "cockpit".into(),
        }
    }
}
