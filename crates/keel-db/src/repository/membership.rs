//! SurrealDB implementation of [`MembershipRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::membership::{CreateMembership, Member, Membership};
use keel_core::models::reference::Reference;
use keel_core::models::role::Role;
use keel_core::new_id;
use keel_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::{DbError, parse_column};

const SELECT_MEMBERSHIP: &str = "SELECT meta::id(id) AS record_id, * FROM membership";

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    record_id: String,
    reference_type: String,
    reference_id: String,
    member_type: String,
    member_id: String,
    role_id: String,
    role_scope: String,
    role_name: String,
    source: Option<String>,
    created_at: DateTime<Utc>,
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            id: self.record_id,
            reference: Reference::new(
                parse_column("membership.reference_type", &self.reference_type)?,
                self.reference_id,
            ),
            member: Member {
                member_type: parse_column("membership.member_type", &self.member_type)?,
                member_id: self.member_id,
            },
            role_id: self.role_id,
            role_scope: parse_column("membership.role_scope", &self.role_scope)?,
            role_name: self.role_name,
            source: self.source,
            created_at: self.created_at,
        })
    }
}

fn into_memberships(rows: Vec<MembershipRow>) -> Result<Vec<Membership>, DbError> {
    rows.into_iter()
        .map(MembershipRow::try_into_membership)
        .collect()
}

#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_by_id(&self, id: &str) -> Result<Membership, DbError> {
        let mut result = self
            .db
            .query(format!("{SELECT_MEMBERSHIP} WHERE id = type::record('membership', $id)"))
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<MembershipRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: id.into(),
        })?;
        row.try_into_membership()
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create(&self, input: CreateMembership) -> KeelResult<Membership> {
        let id = new_id();
        let result = self
            .db
            .query(
                "CREATE type::record('membership', $id) SET \
                 reference_type = $reference_type, reference_id = $reference_id, \
                 member_type = $member_type, member_id = $member_id, \
                 role_id = $role_id, role_scope = $role_scope, \
                 role_name = $role_name, source = $source RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("reference_type", input.reference.reference_type.as_str()))
            .bind(("reference_id", input.reference.reference_id))
            .bind(("member_type", input.member.member_type.as_str()))
            .bind(("member_id", input.member.member_id))
            .bind(("role_id", input.role_id))
            .bind(("role_scope", input.role_scope.as_str()))
            .bind(("role_name", input.role_name))
            .bind(("source", input.source))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(self.get_by_id(&id).await?)
    }

    async fn find_by_member(&self, member: &Member) -> KeelResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_MEMBERSHIP} WHERE member_type = $member_type \
                 AND member_id = $member_id"
            ))
            .bind(("member_type", member.member_type.as_str()))
            .bind(("member_id", member.member_id.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_memberships(rows)?)
    }

    async fn find_by_reference_and_member(
        &self,
        reference: &Reference,
        member: &Member,
    ) -> KeelResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_MEMBERSHIP} WHERE reference_type = $reference_type \
                 AND reference_id = $reference_id AND member_type = $member_type \
                 AND member_id = $member_id"
            ))
            .bind(("reference_type", reference.reference_type.as_str()))
            .bind(("reference_id", reference.reference_id.clone()))
            .bind(("member_type", member.member_type.as_str()))
            .bind(("member_id", member.member_id.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_memberships(rows)?)
    }

    async fn replace_roles(
        &self,
        reference: &Reference,
        member: &Member,
        roles: &[Role],
        source: Option<&str>,
    ) -> KeelResult<Vec<Membership>> {
        let result = self
            .db
            .query(
                "DELETE membership WHERE reference_type = $reference_type \
                 AND reference_id = $reference_id AND member_type = $member_type \
                 AND member_id = $member_id",
            )
            .bind(("reference_type", reference.reference_type.as_str()))
            .bind(("reference_id", reference.reference_id.clone()))
            .bind(("member_type", member.member_type.as_str()))
            .bind(("member_id", member.member_id.clone()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let mut created = Vec::with_capacity(roles.len());
        for role in roles {
            let mut input = CreateMembership::new(reference.clone(), member.clone(), role);
            input.source = source.map(str::to_string);
            created.push(self.create(input).await?);
        }
        Ok(created)
    }

    async fn delete_by_member(&self, member: &Member) -> KeelResult<u64> {
        let result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM (DELETE membership \
                 WHERE member_type = $member_type AND member_id = $member_id \
                 RETURN BEFORE);",
            )
            .bind(("member_type", member.member_type.as_str()))
            .bind(("member_id", member.member_id.clone()))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let removed: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(removed.len() as u64)
    }
}
