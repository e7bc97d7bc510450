//! Explicit tenant scope for collaborator calls.

use serde::{Deserialize, Serialize};

/// The organization (and optionally environment) a unit of work runs in.
///
/// Handlers build one per command and pass it down by reference. There is
/// no thread-local or global "current tenant"; two commands processed
/// concurrently never observe each other's context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub organization_id: String,
    pub environment_id: Option<String>,
}

impl ExecutionContext {
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            environment_id: None,
        }
    }

    pub fn environment(
        organization_id: impl Into<String>,
        environment_id: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            environment_id: Some(environment_id.into()),
        }
    }
}
