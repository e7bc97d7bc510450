//! SurrealDB implementation of [`RoleRepository`].

use keel_core::error::KeelResult;
use keel_core::models::role::{CreateRole, Role, RoleScope};
use keel_core::new_id;
use keel_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::{DbError, parse_column};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    organization_id: String,
    scope: String,
    name: String,
    description: Option<String>,
    default_role: bool,
    system: bool,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: self.record_id,
            organization_id: self.organization_id,
            scope: parse_column("role.scope", &self.scope)?,
            name: self.name,
            description: self.description,
            default_role: self.default_role,
            system: self.system,
        })
    }
}

#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> KeelResult<Role> {
        if self
            .find_by_scope_and_name(input.scope, &input.name, &input.organization_id)
            .await?
            .is_some()
        {
            return Err(DbError::Conflict {
                entity: "role".into(),
                id: format!("{}_{}", input.scope, input.name),
            }
            .into());
        }

        let id = new_id();
        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 organization_id = $organization_id, scope = $scope, name = $name, \
                 description = $description, default_role = $default_role, \
                 system = $system RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("organization_id", input.organization_id.clone()))
            .bind(("scope", input.scope.as_str()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description.clone()))
            .bind(("default_role", input.default_role))
            .bind(("system", input.system))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(Role {
            id,
            organization_id: input.organization_id,
            scope: input.scope,
            name: input.name,
            description: input.description,
            default_role: input.default_role,
            system: input.system,
        })
    }

    async fn find_by_scope_and_name(
        &self,
        scope: RoleScope,
        name: &str,
        organization_id: &str,
    ) -> KeelResult<Option<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE organization_id = $organization_id \
                 AND scope = $scope AND name = $name LIMIT 1",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("scope", scope.as_str()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_role()?)),
            None => Ok(None),
        }
    }
}
