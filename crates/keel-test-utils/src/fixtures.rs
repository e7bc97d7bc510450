//! Fixture helpers writing straight into an [`InMemoryStore`], bypassing
//! the journal.

use chrono::Utc;
use keel_core::models::access_point::{AccessPoint, AccessPointTarget};
use keel_core::models::environment::Environment;
use keel_core::models::membership::{Member, Membership};
use keel_core::models::organization::Organization;
use keel_core::models::record::{OwnedRecord, STATE_STARTED};
use keel_core::models::reference::{Collection, Reference};
use keel_core::models::role::{Role, RoleScope};
use keel_core::models::token::Token;
use keel_core::models::user::User;
use keel_core::new_id;
use keel_core::repository::IndexedKind;

use crate::store::InMemoryStore;

/// Roles every seeded organization gets.
pub const STANDARD_ROLES: &[(RoleScope, &str)] = &[
    (RoleScope::Organization, "ADMIN"),
    (RoleScope::Organization, "USER"),
    (RoleScope::Environment, "ADMIN"),
    (RoleScope::Environment, "API_PUBLISHER"),
    (RoleScope::Environment, "USER"),
];

impl InMemoryStore {
    /// Organization `id` with controller id `cockpit-<id>` and the
    /// [`STANDARD_ROLES`].
    pub fn seed_organization(&self, id: &str) -> Organization {
        let now = Utc::now();
        let organization = Organization {
            id: id.to_string(),
            cockpit_id: Some(format!("cockpit-{id}")),
            hrids: vec![id.to_string()],
            name: id.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.inner.tables();
        tables.organizations.push(organization.clone());
        for (scope, name) in STANDARD_ROLES {
            tables.roles.push(Role {
                id: new_id(),
                organization_id: id.to_string(),
                scope: *scope,
                name: (*name).to_string(),
                description: None,
                default_role: false,
                system: true,
            });
        }
        organization
    }

    /// Remove a seeded role so lookups for it miss.
    pub fn remove_role(&self, scope: RoleScope, name: &str) {
        self.inner
            .tables()
            .roles
            .retain(|r| !(r.scope == scope && r.name == name));
    }

    pub fn seed_environment(&self, organization_id: &str, id: &str, cockpit_id: &str) -> Environment {
        let now = Utc::now();
        let environment = Environment {
            id: id.to_string(),
            organization_id: organization_id.to_string(),
            cockpit_id: Some(cockpit_id.to_string()),
            hrids: vec![id.to_string()],
            name: id.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.tables().environments.push(environment.clone());
        environment
    }

    /// Generic record `id` in `collection`, owned by `reference`.
    pub fn seed_record(&self, collection: Collection, reference: Reference, id: &str) -> OwnedRecord {
        let record = OwnedRecord {
            id: id.to_string(),
            collection,
            reference,
            name: None,
            state: None,
            created_at: Utc::now(),
        };
        self.inner.tables().records.push(record.clone());
        record
    }

    /// A deployed api of the environment, present in the search index.
    pub fn seed_started_api(&self, environment_id: &str, id: &str) -> OwnedRecord {
        let mut record = self.seed_record(Collection::Api, Reference::environment(environment_id), id);
        record.state = Some(STATE_STARTED.to_string());
        let mut tables = self.inner.tables();
        if let Some(stored) = tables
            .records
            .iter_mut()
            .find(|r| r.collection == Collection::Api && r.id == id)
        {
            stored.state = record.state.clone();
        }
        tables.search.push((IndexedKind::Api, id.to_string()));
        record
    }

    pub fn seed_search_entry(&self, kind: IndexedKind, id: &str) {
        self.inner.tables().search.push((kind, id.to_string()));
    }

    /// User `id` of the organization, from the `cockpit` source.
    pub fn seed_user(&self, organization_id: &str, id: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            organization_id: organization_id.to_string(),
            source: "cockpit".into(),
            source_id: format!("ext-{id}"),
            first_name: None,
            last_name: None,
            email: None,
            picture: None,
            custom_fields: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };
        self.inner.tables().users.push(user.clone());
        user
    }

    /// Membership of user `user_id` on `reference` with role `role`.
    pub fn seed_membership(&self, reference: Reference, user_id: &str, role: &str) -> Membership {
        let membership = Membership {
            id: new_id(),
            reference,
            member: Member::user(user_id),
            role_id: new_id(),
            role_scope: RoleScope::Environment,
            role_name: role.to_string(),
            source: None,
            created_at: Utc::now(),
        };
        self.inner.tables().memberships.push(membership.clone());
        membership
    }

    pub fn seed_token(&self, user_id: &str, id: &str) -> Token {
        let token = Token {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: id.to_string(),
            token_hash: String::new(),
            created_at: Utc::now(),
        };
        self.inner.tables().tokens.push(token.clone());
        token
    }

    pub fn seed_access_point(
        &self,
        reference: Reference,
        target: AccessPointTarget,
        host: &str,
    ) -> AccessPoint {
        let access_point = AccessPoint {
            id: new_id(),
            reference,
            target,
            host: host.to_string(),
            secured: false,
            overriding: false,
        };
        self.inner.tables().access_points.push(access_point.clone());
        access_point
    }

    // ----- snapshots -----

    pub fn all_organizations(&self) -> Vec<Organization> {
        self.inner.tables().organizations.clone()
    }

    pub fn all_environments(&self) -> Vec<Environment> {
        self.inner.tables().environments.clone()
    }

    pub fn all_users(&self) -> Vec<User> {
        self.inner.tables().users.clone()
    }

    pub fn all_memberships(&self) -> Vec<Membership> {
        self.inner.tables().memberships.clone()
    }

    pub fn all_tokens(&self) -> Vec<Token> {
        self.inner.tables().tokens.clone()
    }

    pub fn all_access_points(&self) -> Vec<AccessPoint> {
        self.inner.tables().access_points.clone()
    }

    /// Records of `collection`, in insertion order.
    pub fn all_records(&self, collection: Collection) -> Vec<OwnedRecord> {
        self.inner
            .tables()
            .records
            .iter()
            .filter(|r| r.collection == collection)
            .cloned()
            .collect()
    }

    pub fn is_indexed(&self, kind: IndexedKind, id: &str) -> bool {
        self.inner
            .tables()
            .search
            .iter()
            .any(|(k, i)| *k == kind && i == id)
    }
}
