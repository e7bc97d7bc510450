//! Search index documents stored in the `search_entry` table.

use keel_core::context::ExecutionContext;
use keel_core::error::KeelResult;
use keel_core::repository::{IndexedKind, SearchIndex};
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Clone)]
pub struct SurrealSearchIndex<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSearchIndex<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Register a document; indexing an already indexed document is a no-op.
    pub async fn index(
        &self,
        ctx: &ExecutionContext,
        kind: IndexedKind,
        id: &str,
    ) -> KeelResult<()> {
        let result = self
            .db
            .query(
                "UPSERT type::record('search_entry', $key) SET kind = $kind, \
                 document_id = $document_id, environment_id = $environment_id \
                 RETURN NONE",
            )
            .bind(("key", format!("{}:{id}", kind.as_str())))
            .bind(("kind", kind.as_str()))
            .bind(("document_id", id.to_string()))
            .bind(("environment_id", ctx.environment_id.clone()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }

    pub async fn contains(&self, kind: IndexedKind, id: &str) -> KeelResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM search_entry \
                 WHERE kind = $kind AND document_id = $document_id",
            )
            .bind(("kind", kind.as_str()))
            .bind(("document_id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        let found: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(!found.is_empty())
    }
}

impl<C: Connection> SearchIndex for SurrealSearchIndex<C> {
    async fn remove(&self, _ctx: &ExecutionContext, kind: IndexedKind, id: &str) -> KeelResult<()> {
        let result = self
            .db
            .query("DELETE search_entry WHERE kind = $kind AND document_id = $document_id")
            .bind(("kind", kind.as_str()))
            .bind(("document_id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }
}
