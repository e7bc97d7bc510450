//! Runtime state kept alongside the api and dictionary definitions.
//!
//! Stopping a workload flips its `state` column to `STOPPED`; gateways
//! watching the table undeploy it.

use keel_core::context::ExecutionContext;
use keel_core::error::KeelResult;
use keel_core::models::record::{STATE_STARTED, STATE_STOPPED};
use keel_core::models::reference::{Collection, ReferenceType};
use keel_core::repository::RuntimeService;
use surrealdb::{Connection, Surreal};
use tracing::debug;

use crate::error::DbError;

#[derive(Clone)]
pub struct SurrealRuntimeService<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRuntimeService<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn ids(
        &self,
        ctx: &ExecutionContext,
        collection: Collection,
        state: Option<&'static str>,
    ) -> Result<Vec<String>, DbError> {
        let Some(environment_id) = ctx.environment_id.clone() else {
            return Ok(Vec::new());
        };
        let state_filter = if state.is_some() { " AND state = $state" } else { "" };

        let mut result = self
            .db
            .query(format!(
                "SELECT VALUE meta::id(id) FROM type::table($table) \
                 WHERE reference_type = $owner_type AND reference_id = $owner{state_filter}"
            ))
            .bind(("table", collection.table()))
            .bind(("owner_type", ReferenceType::Environment.as_str()))
            .bind(("owner", environment_id))
            .bind(("state", state.map(str::to_string)))
            .await?;
        Ok(result.take(0)?)
    }

    async fn stop(&self, collection: Collection, id: &str) -> Result<(), DbError> {
        self.db
            .query("UPDATE type::record($table, $id) SET state = $state")
            .bind(("table", collection.table()))
            .bind(("id", id.to_string()))
            .bind(("state", STATE_STOPPED))
            .await?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }
}

impl<C: Connection> RuntimeService for SurrealRuntimeService<C> {
    async fn started_apis(&self, ctx: &ExecutionContext) -> KeelResult<Vec<String>> {
        Ok(self.ids(ctx, Collection::Api, Some(STATE_STARTED)).await?)
    }

    async fn stop_api(&self, ctx: &ExecutionContext, api_id: &str) -> KeelResult<()> {
        debug!(organization_id = %ctx.organization_id, api_id, "Stopping api");
        Ok(self.stop(Collection::Api, api_id).await?)
    }

    async fn dictionaries(&self, ctx: &ExecutionContext) -> KeelResult<Vec<String>> {
        Ok(self.ids(ctx, Collection::Dictionary, None).await?)
    }

    async fn stop_dictionary(&self, ctx: &ExecutionContext, dictionary_id: &str) -> KeelResult<()> {
        debug!(organization_id = %ctx.organization_id, dictionary_id, "Stopping dictionary");
        Ok(self.stop(Collection::Dictionary, dictionary_id).await?)
    }
}
