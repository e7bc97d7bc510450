//! SurrealDB implementation of [`OwnedRecordRepository`].
//!
//! Generic collections share one table shape (see `schema_v2`). Bulk
//! deletes also reach the typed tables, each through its own owner
//! columns.

use chrono::{DateTime, Utc};
use keel_core::error::{KeelError, KeelResult};
use keel_core::models::record::{CreateOwnedRecord, OwnedRecord};
use keel_core::models::reference::{Collection, Reference, ReferenceType};
use keel_core::new_id;
use keel_core::repository::OwnedRecordRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::record_exists;
use crate::error::{DbError, parse_column};

#[derive(Debug, SurrealValue)]
struct OwnedRecordRow {
    record_id: String,
    reference_type: String,
    reference_id: String,
    name: Option<String>,
    state: Option<String>,
    created_at: DateTime<Utc>,
}

impl OwnedRecordRow {
    fn try_into_record(self, collection: Collection) -> Result<OwnedRecord, DbError> {
        Ok(OwnedRecord {
            id: self.record_id,
            collection,
            reference: Reference::new(
                parse_column("reference_type", &self.reference_type)?,
                self.reference_id,
            ),
            name: self.name,
            state: self.state,
            created_at: self.created_at,
        })
    }
}

/// `WHERE` clause selecting the rows of `collection` owned by
/// `reference`, binding `$owner` and `$owner_type`. `None` when the
/// collection can never be owned by that kind of reference.
fn owner_filter(collection: Collection, reference_type: ReferenceType) -> Option<&'static str> {
    match collection {
        Collection::Environment | Collection::User | Collection::Role => {
            (reference_type == ReferenceType::Organization).then_some("organization_id = $owner")
        }
        Collection::Token => (reference_type == ReferenceType::User).then_some("user_id = $owner"),
        _ => Some("reference_type = $owner_type AND reference_id = $owner"),
    }
}

fn typed_collection(collection: Collection) -> KeelError {
    KeelError::Validation {
        message: format!("{collection} is not a generic collection"),
    }
}

#[derive(Clone)]
pub struct SurrealOwnedRecordRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOwnedRecordRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OwnedRecordRepository for SurrealOwnedRecordRepository<C> {
    async fn insert(
        &self,
        collection: Collection,
        input: CreateOwnedRecord,
    ) -> KeelResult<OwnedRecord> {
        if collection.is_typed() {
            return Err(typed_collection(collection));
        }

        let id = input.id.unwrap_or_else(new_id);
        let result = self
            .db
            .query(
                "CREATE type::record($table, $id) SET \
                 reference_type = $reference_type, reference_id = $reference_id, \
                 name = $name, state = $state; \
                 SELECT meta::id(id) AS record_id, * FROM type::record($table, $id);",
            )
            .bind(("table", collection.table()))
            .bind(("id", id.clone()))
            .bind(("reference_type", input.reference.reference_type.as_str()))
            .bind(("reference_id", input.reference.reference_id))
            .bind(("name", input.name))
            .bind(("state", input.state))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<OwnedRecordRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: collection.table().into(),
            id,
        })?;
        Ok(row.try_into_record(collection)?)
    }

    async fn find_by_reference(
        &self,
        collection: Collection,
        reference: &Reference,
    ) -> KeelResult<Vec<OwnedRecord>> {
        if collection.is_typed() {
            return Err(typed_collection(collection));
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::table($table) \
                 WHERE reference_type = $owner_type AND reference_id = $owner \
                 ORDER BY created_at ASC",
            )
            .bind(("table", collection.table()))
            .bind(("owner_type", reference.reference_type.as_str()))
            .bind(("owner", reference.reference_id.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OwnedRecordRow> = result.take(0).map_err(DbError::from)?;
        let records = rows
            .into_iter()
            .map(|row| row.try_into_record(collection))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn set_state(&self, collection: Collection, id: &str, state: &str) -> KeelResult<()> {
        if collection.is_typed() {
            return Err(typed_collection(collection));
        }

        if !record_exists(&self.db, collection.table(), id).await? {
            return Err(KeelError::not_found(collection.table(), id));
        }

        let result = self
            .db
            .query("UPDATE type::record($table, $id) SET state = $state RETURN NONE")
            .bind(("table", collection.table()))
            .bind(("id", id.to_string()))
            .bind(("state", state.to_string()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_reference(
        &self,
        collection: Collection,
        reference: &Reference,
    ) -> KeelResult<Vec<String>> {
        let Some(filter) = owner_filter(collection, reference.reference_type) else {
            return Ok(Vec::new());
        };

        let query = format!(
            "SELECT VALUE meta::id(id) FROM \
             (DELETE type::table($table) WHERE {filter} RETURN BEFORE);"
        );
        let result = self
            .db
            .query(&query)
            .bind(("table", collection.table()))
            .bind(("owner_type", reference.reference_type.as_str()))
            .bind(("owner", reference.reference_id.clone()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_owned_tables_ignore_other_owners() {
        assert!(owner_filter(Collection::User, ReferenceType::Organization).is_some());
        assert!(owner_filter(Collection::User, ReferenceType::Environment).is_none());
        assert!(owner_filter(Collection::Token, ReferenceType::Organization).is_none());
    }

    #[test]
    fn referenced_tables_filter_on_both_owner_columns() {
        for collection in [Collection::Membership, Collection::AccessPoint, Collection::Api] {
            let filter = owner_filter(collection, ReferenceType::Group).unwrap();
            assert!(filter.contains("reference_type") && filter.contains("reference_id"));
        }
    }
}
