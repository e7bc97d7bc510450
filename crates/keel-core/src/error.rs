//! Error types for the KEEL control plane.

use thiserror::Error;

use crate::models::role::RoleScope;

#[derive(Debug, Error)]
pub enum KeelError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    #[error("Role not found: {scope}_{name} in organization {organization_id}")]
    RoleNotFound {
        scope: RoleScope,
        name: String,
        organization_id: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeelError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type KeelResult<T> = Result<T, KeelError>;
