//! Database-specific error types and conversions.

use keel_core::error::KeelError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

impl From<DbError> for KeelError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => KeelError::NotFound { entity, id },
            DbError::Conflict { entity, id } => KeelError::AlreadyExists { entity, id },
            other => KeelError::Database(other.to_string()),
        }
    }
}

/// Parse an enum column stored as its `SCREAMING_SNAKE_CASE` name.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, DbError>
where
    T: std::str::FromStr,
{
    value
        .parse()
        .map_err(|_| DbError::Corrupt(format!("{column}: {value}")))
}
