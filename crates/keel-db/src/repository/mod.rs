//! SurrealDB repository implementations.

mod access_point;
mod environment;
mod membership;
mod organization;
mod record;
mod role;
mod runtime;
mod search;
mod store;
mod token;
mod user;

pub use access_point::SurrealAccessPointRepository;
pub use environment::SurrealEnvironmentRepository;
pub use membership::SurrealMembershipRepository;
pub use organization::SurrealOrganizationRepository;
pub use record::SurrealOwnedRecordRepository;
pub use role::SurrealRoleRepository;
pub use runtime::SurrealRuntimeService;
pub use search::SurrealSearchIndex;
pub use store::SurrealStore;
pub use token::SurrealTokenRepository;
pub use user::SurrealUserRepository;

use surrealdb::{Connection, Surreal};

use crate::error::DbError;

/// Delete one record by id, failing with [`DbError::NotFound`] when it was
/// not there.
pub(crate) async fn delete_record<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: &str,
) -> Result<(), DbError> {
    let result = db
        .query(
            "SELECT VALUE meta::id(id) FROM \
             (DELETE type::record($table, $id) RETURN BEFORE);",
        )
        .bind(("table", table))
        .bind(("id", id.to_string()))
        .await?;
    let mut result = result
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let found: Vec<String> = result.take(0)?;
    if found.is_empty() {
        return Err(DbError::NotFound {
            entity: table.into(),
            id: id.into(),
        });
    }
    Ok(())
}

/// Whether a record with this id exists.
pub(crate) async fn record_exists<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: &str,
) -> Result<bool, DbError> {
    let mut result = db
        .query("SELECT VALUE meta::id(id) FROM type::record($table, $id)")
        .bind(("table", table))
        .bind(("id", id.to_string()))
        .await?;
    let found: Vec<String> = result.take(0)?;
    Ok(!found.is_empty())
}
