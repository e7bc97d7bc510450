//! Access point domain model.
//!
//! An access point is a host through which one of the platform's surfaces
//! (console, portal, gateway, ...) is reached for a given organization or
//! environment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeelError;
use crate::models::reference::Reference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessPointTarget {
    Console,
    ConsoleApi,
    Portal,
    PortalApi,
    Gateway,
    TcpGateway,
    KafkaGateway,
}

impl AccessPointTarget {
    pub const ALL: &'static [AccessPointTarget] = &[
        AccessPointTarget::Console,
        AccessPointTarget::ConsoleApi,
        AccessPointTarget::Portal,
        AccessPointTarget::PortalApi,
        AccessPointTarget::Gateway,
        AccessPointTarget::TcpGateway,
        AccessPointTarget::KafkaGateway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "CONSOLE",
            Self::ConsoleApi => "CONSOLE_API",
            Self::Portal => "PORTAL",
            Self::PortalApi => "PORTAL_API",
            Self::Gateway => "GATEWAY",
            Self::TcpGateway => "TCP_GATEWAY",
            Self::KafkaGateway => "KAFKA_GATEWAY",
        }
    }
}

impl fmt::Display for AccessPointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessPointTarget {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| KeelError::Validation {
                message: format!("unknown access point target: {s}"),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub id: String,
    /// Organization or environment the host is bound to.
    pub reference: Reference,
    pub target: AccessPointTarget,
    pub host: String,
    /// Served over TLS.
    pub secured: bool,
    /// Custom host replacing the platform default.
    pub overriding: bool,
}

impl AccessPoint {
    /// `http(s)://host` depending on [`secured`](Self::secured).
    pub fn url(&self) -> String {
        let scheme = if self.secured { "https" } else { "http" };
        format!("{scheme}://{}", self.host)
    }
}

/// Desired state of one access point; the id is assigned on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccessPoint {
    pub target: AccessPointTarget,
    pub host: String,
    #[serde(default)]
    pub secured: bool,
    #[serde(default)]
    pub overriding: bool,
}
