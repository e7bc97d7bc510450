//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use keel_core::new_id;
use keel_core::repository::OrganizationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::{delete_record, record_exists};
use crate::error::DbError;

const SELECT_ORGANIZATION: &str = "SELECT meta::id(id) AS record_id, * FROM organization";

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    record_id: String,
    cockpit_id: Option<String>,
    hrids: Vec<String>,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.record_id,
            cockpit_id: row.cockpit_id,
            hrids: row.hrids,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> KeelResult<Organization> {
        let id = input.id.unwrap_or_else(new_id);
        if record_exists(&self.db, "organization", &id).await? {
            return Err(DbError::Conflict {
                entity: "organization".into(),
                id,
            }
            .into());
        }

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 cockpit_id = $cockpit_id, hrids = $hrids, name = $name, \
                 description = $description RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("cockpit_id", input.cockpit_id))
            .bind(("hrids", input.hrids))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        self.get_by_id(&id).await
    }

    async fn get_by_id(&self, id: &str) -> KeelResult<Organization> {
        let mut result = self
            .db
            .query(format!("{SELECT_ORGANIZATION} WHERE id = type::record('organization', $id)"))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id.into(),
        })?;
        Ok(row.into())
    }

    async fn find_by_cockpit_id(&self, cockpit_id: &str) -> KeelResult<Option<Organization>> {
        let mut result = self
            .db
            .query(format!("{SELECT_ORGANIZATION} WHERE cockpit_id = $cockpit_id LIMIT 1"))
            .bind(("cockpit_id", cockpit_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(Organization::from))
    }

    async fn update(&self, id: &str, input: UpdateOrganization) -> KeelResult<Organization> {
        if !record_exists(&self.db, "organization", id).await? {
            return Err(DbError::NotFound {
                entity: "organization".into(),
                id: id.into(),
            }
            .into());
        }

        let mut sets = Vec::new();
        if input.cockpit_id.is_some() {
            sets.push("cockpit_id = $cockpit_id");
        }
        if input.hrids.is_some() {
            sets.push("hrids = $hrids");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('organization', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(cockpit_id) = input.cockpit_id {
            builder = builder.bind(("cockpit_id", cockpit_id));
        }
        if let Some(hrids) = input.hrids {
            builder = builder.bind(("hrids", hrids));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        Ok(delete_record(&self.db, "organization", id).await?)
    }
}
