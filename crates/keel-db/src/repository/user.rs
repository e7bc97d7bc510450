//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::user::{CreateUser, UpdateUser, User};
use keel_core::new_id;
use keel_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::{delete_record, record_exists};
use crate::error::DbError;

const SELECT_USER: &str = "SELECT meta::id(id) AS record_id, * FROM user";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    organization_id: String,
    source: String,
    source_id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    custom_fields: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.record_id,
            organization_id: row.organization_id,
            source: row.source,
            source_id: row.source_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            picture: row.picture,
            custom_fields: row.custom_fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    /// Fails with `AlreadyExists` when the id or the
    /// `(organization, source, source_id)` triple is taken.
    async fn create(&self, input: CreateUser) -> KeelResult<User> {
        let id = input.id.unwrap_or_else(new_id);
        let taken = record_exists(&self.db, "user", &id).await?
            || self
                .find_by_source(&input.organization_id, &input.source, &input.source_id)
                .await?
                .is_some();
        if taken {
            return Err(DbError::Conflict {
                entity: "user".into(),
                id,
            }
            .into());
        }

        let custom_fields = input
            .custom_fields
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 organization_id = $organization_id, source = $source, \
                 source_id = $source_id, first_name = $first_name, \
                 last_name = $last_name, email = $email, picture = $picture, \
                 custom_fields = $custom_fields RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("organization_id", input.organization_id))
            .bind(("source", input.source))
            .bind(("source_id", input.source_id))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("email", input.email))
            .bind(("picture", input.picture))
            .bind(("custom_fields", custom_fields))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        self.get_by_id(&id).await
    }

    async fn get_by_id(&self, id: &str) -> KeelResult<User> {
        let mut result = self
            .db
            .query(format!("{SELECT_USER} WHERE id = type::record('user', $id)"))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.into(),
        })?;
        Ok(row.into())
    }

    async fn find_by_source(
        &self,
        organization_id: &str,
        source: &str,
        source_id: &str,
    ) -> KeelResult<Option<User>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_USER} WHERE organization_id = $organization_id \
                 AND source = $source AND source_id = $source_id LIMIT 1"
            ))
            .bind(("organization_id", organization_id.to_string()))
            .bind(("source", source.to_string()))
            .bind(("source_id", source_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(User::from))
    }

    async fn update(&self, id: &str, input: UpdateUser) -> KeelResult<User> {
        if !record_exists(&self.db, "user", id).await? {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id.into(),
            }
            .into());
        }

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.picture.is_some() {
            sets.push("picture = $picture");
        }
        if input.custom_fields.is_some() {
            sets.push("custom_fields = $custom_fields");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(picture) = input.picture {
            builder = builder.bind(("picture", picture));
        }
        if let Some(custom_fields) = input.custom_fields {
            builder = builder.bind(("custom_fields", custom_fields));
        }

        let result = builder.await.map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        Ok(delete_record(&self.db, "user", id).await?)
    }
}
