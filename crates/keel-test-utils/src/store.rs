//! In-memory [`Store`] with call journal and fault injection.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use keel_core::context::ExecutionContext;
use keel_core::error::{KeelError, KeelResult};
use keel_core::models::access_point::{AccessPoint, AccessPointTarget, NewAccessPoint};
use keel_core::models::environment::{CreateEnvironment, Environment, UpdateEnvironment};
use keel_core::models::membership::{CreateMembership, Member, Membership};
use keel_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use keel_core::models::record::{CreateOwnedRecord, OwnedRecord, STATE_STARTED, STATE_STOPPED};
use keel_core::models::reference::{Collection, Reference, ReferenceType};
use keel_core::models::role::{CreateRole, Role, RoleScope};
use keel_core::models::token::{CreateToken, Token};
use keel_core::models::user::{CreateUser, UpdateUser, User};
use keel_core::new_id;
use keel_core::repository::{
    AccessPointRepository, EnvironmentRepository, IndexedKind, MembershipRepository,
    OrganizationRepository, OwnedRecordRepository, RoleRepository, RuntimeService, SearchIndex,
    Store, TokenRepository, UserRepository,
};

/// A journaled collaborator call. Reads are not journaled, except role
/// lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateOrganization(String),
    UpdateOrganization(String),
    DeleteOrganization(String),
    CreateEnvironment(String),
    UpdateEnvironment(String),
    DeleteEnvironment(String),
    CreateUser(String),
    UpdateUser(String),
    DeleteUser(String),
    FindRole { scope: RoleScope, name: String },
    CreateMembership { reference: Reference, role: String },
    ReplaceRoles { reference: Reference, member_id: String },
    DeleteMembershipsOf(String),
    CreateToken(String),
    DeleteToken(String),
    ReplaceAccessPoints(Reference),
    DeleteAccessPoints(Reference),
    DeleteRecords { collection: Collection, reference: Reference },
    StopApi(String),
    StopDictionary(String),
    Unindex(IndexedKind, String),
}

/// An operation that can be made to fail with a database error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    CreateUser,
    DeleteUser,
    /// Role lookups of the given scope.
    FindRole(RoleScope),
    CreateMembership(RoleScope),
    DeleteMemberships,
    CreateToken,
    DeleteToken,
    ReplaceAccessPoints,
    DeleteRecords(Collection),
    StopApi,
    Unindex,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) organizations: Vec<Organization>,
    pub(crate) environments: Vec<Environment>,
    pub(crate) users: Vec<User>,
    pub(crate) roles: Vec<Role>,
    pub(crate) memberships: Vec<Membership>,
    pub(crate) tokens: Vec<Token>,
    pub(crate) access_points: Vec<AccessPoint>,
    pub(crate) records: Vec<OwnedRecord>,
    pub(crate) search: Vec<(IndexedKind, String)>,
}

#[derive(Debug, Default)]
pub(crate) struct Inner {
    tables: Mutex<Tables>,
    calls: Mutex<Vec<Call>>,
    faults: Mutex<Vec<Fault>>,
    panics: Mutex<Vec<Fault>>,
}

impl Inner {
    pub(crate) fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("lock")
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }

    fn check(&self, fault: Fault) -> KeelResult<()> {
        let panics = self.panics.lock().expect("lock").contains(&fault);
        if panics {
            panic!("injected panic: {fault:?}");
        }
        if self.faults.lock().expect("lock").contains(&fault) {
            return Err(KeelError::Database(format!("injected fault: {fault:?}")));
        }
        Ok(())
    }
}

macro_rules! views {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone)]
            pub struct $name {
                inner: Arc<Inner>,
            }
        )*
    };
}

views!(
    MemOrganizations,
    MemEnvironments,
    MemUsers,
    MemRoles,
    MemMemberships,
    MemTokens,
    MemAccessPoints,
    MemRecords,
    MemRuntime,
    MemSearch,
);

/// Everything kept in memory, shared by cheap clones.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    pub(crate) inner: Arc<Inner>,
    organizations: MemOrganizations,
    environments: MemEnvironments,
    users: MemUsers,
    roles: MemRoles,
    memberships: MemMemberships,
    tokens: MemTokens,
    access_points: MemAccessPoints,
    records: MemRecords,
    runtime: MemRuntime,
    search: MemSearch,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let inner = Arc::new(Inner::default());
        Self {
            organizations: MemOrganizations { inner: inner.clone() },
            environments: MemEnvironments { inner: inner.clone() },
            users: MemUsers { inner: inner.clone() },
            roles: MemRoles { inner: inner.clone() },
            memberships: MemMemberships { inner: inner.clone() },
            tokens: MemTokens { inner: inner.clone() },
            access_points: MemAccessPoints { inner: inner.clone() },
            records: MemRecords { inner: inner.clone() },
            runtime: MemRuntime { inner: inner.clone() },
            search: MemSearch { inner: inner.clone() },
            inner,
        }
    }

    /// Every journaled call, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().expect("lock").clone()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().expect("lock").clear();
    }

    /// Journaled calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Make every subsequent matching operation fail.
    pub fn inject_failure(&self, fault: Fault) {
        self.inner.faults.lock().expect("lock").push(fault);
    }

    /// Make every subsequent matching operation panic instead of failing.
    pub fn inject_panic(&self, fault: Fault) {
        self.inner.panics.lock().expect("lock").push(fault);
    }

    pub fn clear_failures(&self) {
        self.inner.faults.lock().expect("lock").clear();
        self.inner.panics.lock().expect("lock").clear();
    }
}

impl Store for InMemoryStore {
    type Organizations = MemOrganizations;
    type Environments = MemEnvironments;
    type Users = MemUsers;
    type Roles = MemRoles;
    type Memberships = MemMemberships;
    type Tokens = MemTokens;
    type AccessPoints = MemAccessPoints;
    type Records = MemRecords;
    type Runtime = MemRuntime;
    type Search = MemSearch;

    fn organizations(&self) -> &MemOrganizations {
        &self.organizations
    }
    fn environments(&self) -> &MemEnvironments {
        &self.environments
    }
    fn users(&self) -> &MemUsers {
        &self.users
    }
    fn roles(&self) -> &MemRoles {
        &self.roles
    }
    fn memberships(&self) -> &MemMemberships {
        &self.memberships
    }
    fn tokens(&self) -> &MemTokens {
        &self.tokens
    }
    fn access_points(&self) -> &MemAccessPoints {
        &self.access_points
    }
    fn records(&self) -> &MemRecords {
        &self.records
    }
    fn runtime(&self) -> &MemRuntime {
        &self.runtime
    }
    fn search(&self) -> &MemSearch {
        &self.search
    }
}

// ---------------------------------------------------------------------------
// Organizations & environments
// ---------------------------------------------------------------------------

impl OrganizationRepository for MemOrganizations {
    async fn create(&self, input: CreateOrganization) -> KeelResult<Organization> {
        let id = input.id.unwrap_or_else(new_id);
        self.inner.record(Call::CreateOrganization(id.clone()));
        let mut tables = self.inner.tables();
        if tables.organizations.iter().any(|o| o.id == id) {
            return Err(KeelError::AlreadyExists {
                entity: "organization".into(),
                id,
            });
        }
        let now = Utc::now();
        let organization = Organization {
            id,
            cockpit_id: input.cockpit_id,
            hrids: input.hrids,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        tables.organizations.push(organization.clone());
        Ok(organization)
    }

    async fn get_by_id(&self, id: &str) -> KeelResult<Organization> {
        self.inner
            .tables()
            .organizations
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| KeelError::not_found("organization", id))
    }

    async fn find_by_cockpit_id(&self, cockpit_id: &str) -> KeelResult<Option<Organization>> {
        Ok(self
            .inner
            .tables()
            .organizations
            .iter()
            .find(|o| o.cockpit_id.as_deref() == Some(cockpit_id))
            .cloned())
    }

    async fn update(&self, id: &str, input: UpdateOrganization) -> KeelResult<Organization> {
        self.inner.record(Call::UpdateOrganization(id.to_string()));
        let mut tables = self.inner.tables();
        let organization = tables
            .organizations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| KeelError::not_found("organization", id))?;
        if let Some(cockpit_id) = input.cockpit_id {
            organization.cockpit_id = Some(cockpit_id);
        }
        if let Some(hrids) = input.hrids {
            organization.hrids = hrids;
        }
        if let Some(name) = input.name {
            organization.name = name;
        }
        if let Some(description) = input.description {
            organization.description = description;
        }
        organization.updated_at = Utc::now();
        Ok(organization.clone())
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        self.inner.record(Call::DeleteOrganization(id.to_string()));
        let mut tables = self.inner.tables();
        let before = tables.organizations.len();
        tables.organizations.retain(|o| o.id != id);
        if tables.organizations.len() == before {
            return Err(KeelError::not_found("organization", id));
        }
        Ok(())
    }
}

impl EnvironmentRepository for MemEnvironments {
    async fn create(&self, input: CreateEnvironment) -> KeelResult<Environment> {
        let id = input.id.unwrap_or_else(new_id);
        self.inner.record(Call::CreateEnvironment(id.clone()));
        let mut tables = self.inner.tables();
        if tables.environments.iter().any(|e| e.id == id) {
            return Err(KeelError::AlreadyExists {
                entity: "environment".into(),
                id,
            });
        }
        let now = Utc::now();
        let environment = Environment {
            id,
            organization_id: input.organization_id,
            cockpit_id: input.cockpit_id,
            hrids: input.hrids,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        tables.environments.push(environment.clone());
        Ok(environment)
    }

    async fn get_by_id(&self, id: &str) -> KeelResult<Environment> {
        self.inner
            .tables()
            .environments
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| KeelError::not_found("environment", id))
    }

    async fn find_by_cockpit_id(&self, cockpit_id: &str) -> KeelResult<Option<Environment>> {
        Ok(self
            .inner
            .tables()
            .environments
            .iter()
            .find(|e| e.cockpit_id.as_deref() == Some(cockpit_id))
            .cloned())
    }

    async fn update(&self, id: &str, input: UpdateEnvironment) -> KeelResult<Environment> {
        self.inner.record(Call::UpdateEnvironment(id.to_string()));
        let mut tables = self.inner.tables();
        let environment = tables
            .environments
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| KeelError::not_found("environment", id))?;
        if let Some(cockpit_id) = input.cockpit_id {
            environment.cockpit_id = Some(cockpit_id);
        }
        if let Some(hrids) = input.hrids {
            environment.hrids = hrids;
        }
        if let Some(name) = input.name {
            environment.name = name;
        }
        if let Some(description) = input.description {
            environment.description = description;
        }
        environment.updated_at = Utc::now();
        Ok(environment.clone())
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        self.inner.record(Call::DeleteEnvironment(id.to_string()));
        let mut tables = self.inner.tables();
        let before = tables.environments.len();
        tables.environments.retain(|e| e.id != id);
        if tables.environments.len() == before {
            return Err(KeelError::not_found("environment", id));
        }
        Ok(())
    }

    async fn list_by_organization(&self, organization_id: &str) -> KeelResult<Vec<Environment>> {
        Ok(self
            .inner
            .tables()
            .environments
            .iter()
            .filter(|e| e.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Identity & access
// ---------------------------------------------------------------------------

impl UserRepository for MemUsers {
    async fn create(&self, input: CreateUser) -> KeelResult<User> {
        let id = input.id.unwrap_or_else(new_id);
        self.inner.record(Call::CreateUser(input.source_id.clone()));
        self.inner.check(Fault::CreateUser)?;
        let mut tables = self.inner.tables();
        if tables.users.iter().any(|u| {
            u.organization_id == input.organization_id
                && u.source == input.source
                && u.source_id == input.source_id
        }) {
            return Err(KeelError::AlreadyExists {
                entity: "user".into(),
                id: input.source_id,
            });
        }
        let now = Utc::now();
        let user = User {
            id,
            organization_id: input.organization_id,
            source: input.source,
            source_id: input.source_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            picture: input.picture,
            custom_fields: input
                .custom_fields
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: &str) -> KeelResult<User> {
        self.inner
            .tables()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| KeelError::not_found("user", id))
    }

    async fn find_by_source(
        &self,
        organization_id: &str,
        source: &str,
        source_id: &str,
    ) -> KeelResult<Option<User>> {
        Ok(self
            .inner
            .tables()
            .users
            .iter()
            .find(|u| {
                u.organization_id == organization_id && u.source == source && u.source_id == source_id
            })
            .cloned())
    }

    async fn update(&self, id: &str, input: UpdateUser) -> KeelResult<User> {
        self.inner.record(Call::UpdateUser(id.to_string()));
        let mut tables = self.inner.tables();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| KeelError::not_found("user", id))?;
        if let Some(v) = input.first_name {
            user.first_name = Some(v);
        }
        if let Some(v) = input.last_name {
            user.last_name = Some(v);
        }
        if let Some(v) = input.email {
            user.email = Some(v);
        }
        if let Some(v) = input.picture {
            user.picture = Some(v);
        }
        if let Some(v) = input.custom_fields {
            user.custom_fields = v;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        self.inner.record(Call::DeleteUser(id.to_string()));
        self.inner.check(Fault::DeleteUser)?;
        let mut tables = self.inner.tables();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(KeelError::not_found("user", id));
        }
        Ok(())
    }
}

impl RoleRepository for MemRoles {
    async fn create(&self, input: CreateRole) -> KeelResult<Role> {
        let role = Role {
            id: new_id(),
            organization_id: input.organization_id,
            scope: input.scope,
            name: input.name,
            description: input.description,
            default_role: input.default_role,
            system: input.system,
        };
        self.inner.tables().roles.push(role.clone());
        Ok(role)
    }

    async fn find_by_scope_and_name(
        &self,
        scope: RoleScope,
        name: &str,
        organization_id: &str,
    ) -> KeelResult<Option<Role>> {
        self.inner.record(Call::FindRole {
            scope,
            name: name.to_string(),
        });
        self.inner.check(Fault::FindRole(scope))?;
        Ok(self
            .inner
            .tables()
            .roles
            .iter()
            .find(|r| r.scope == scope && r.name == name && r.organization_id == organization_id)
            .cloned())
    }
}

fn membership(input: CreateMembership) -> Membership {
    Membership {
        id: new_id(),
        reference: input.reference,
        member: input.member,
        role_id: input.role_id,
        role_scope: input.role_scope,
        role_name: input.role_name,
        source: input.source,
        created_at: Utc::now(),
    }
}

impl MembershipRepository for MemMemberships {
    async fn create(&self, input: CreateMembership) -> KeelResult<Membership> {
        self.inner.record(Call::CreateMembership {
            reference: input.reference.clone(),
            role: input.role_name.clone(),
        });
        self.inner.check(Fault::CreateMembership(input.role_scope))?;
        let membership = membership(input);
        self.inner.tables().memberships.push(membership.clone());
        Ok(membership)
    }

    async fn find_by_member(&self, member: &Member) -> KeelResult<Vec<Membership>> {
        Ok(self
            .inner
            .tables()
            .memberships
            .iter()
            .filter(|m| &m.member == member)
            .cloned()
            .collect())
    }

    async fn find_by_reference_and_member(
        &self,
        reference: &Reference,
        member: &Member,
    ) -> KeelResult<Vec<Membership>> {
        Ok(self
            .inner
            .tables()
            .memberships
            .iter()
            .filter(|m| &m.reference == reference && &m.member == member)
            .cloned()
            .collect())
    }

    async fn replace_roles(
        &self,
        reference: &Reference,
        member: &Member,
        roles: &[Role],
        source: Option<&str>,
    ) -> KeelResult<Vec<Membership>> {
        self.inner.record(Call::ReplaceRoles {
            reference: reference.clone(),
            member_id: member.member_id.clone(),
        });
        let mut tables = self.inner.tables();
        tables
            .memberships
            .retain(|m| !(&m.reference == reference && &m.member == member));
        let created: Vec<Membership> = roles
            .iter()
            .map(|role| {
                let mut input = CreateMembership::new(reference.clone(), member.clone(), role);
                input.source = source.map(str::to_string);
                membership(input)
            })
            .collect();
        tables.memberships.extend(created.iter().cloned());
        Ok(created)
    }

    async fn delete_by_member(&self, member: &Member) -> KeelResult<u64> {
        self.inner
            .record(Call::DeleteMembershipsOf(member.member_id.clone()));
        self.inner.check(Fault::DeleteMemberships)?;
        let mut tables = self.inner.tables();
        let before = tables.memberships.len();
        tables.memberships.retain(|m| &m.member != member);
        Ok((before - tables.memberships.len()) as u64)
    }
}

impl TokenRepository for MemTokens {
    async fn create(&self, input: CreateToken) -> KeelResult<Token> {
        self.inner.record(Call::CreateToken(input.user_id.clone()));
        self.inner.check(Fault::CreateToken)?;
        let token = Token {
            id: new_id(),
            user_id: input.user_id,
            name: input.name,
            token_hash: input.token_hash,
            created_at: Utc::now(),
        };
        self.inner.tables().tokens.push(token.clone());
        Ok(token)
    }

    async fn find_by_user(&self, user_id: &str) -> KeelResult<Vec<Token>> {
        Ok(self
            .inner
            .tables()
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        self.inner.record(Call::DeleteToken(id.to_string()));
        self.inner.check(Fault::DeleteToken)?;
        let mut tables = self.inner.tables();
        let before = tables.tokens.len();
        tables.tokens.retain(|t| t.id != id);
        if tables.tokens.len() == before {
            return Err(KeelError::not_found("token", id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Access points
// ---------------------------------------------------------------------------

impl AccessPointRepository for MemAccessPoints {
    async fn find_by_reference(&self, reference: &Reference) -> KeelResult<Vec<AccessPoint>> {
        Ok(self
            .inner
            .tables()
            .access_points
            .iter()
            .filter(|ap| &ap.reference == reference)
            .cloned()
            .collect())
    }

    async fn find_by_reference_and_target(
        &self,
        reference: &Reference,
        target: AccessPointTarget,
    ) -> KeelResult<Vec<AccessPoint>> {
        Ok(self
            .inner
            .tables()
            .access_points
            .iter()
            .filter(|ap| &ap.reference == reference && ap.target == target)
            .cloned()
            .collect())
    }

    async fn find_by_host(&self, host: &str) -> KeelResult<Option<AccessPoint>> {
        Ok(self
            .inner
            .tables()
            .access_points
            .iter()
            .find(|ap| ap.host == host)
            .cloned())
    }

    async fn replace(
        &self,
        reference: &Reference,
        access_points: Vec<NewAccessPoint>,
    ) -> KeelResult<Vec<AccessPoint>> {
        self.inner.record(Call::ReplaceAccessPoints(reference.clone()));
        self.inner.check(Fault::ReplaceAccessPoints)?;
        let mut tables = self.inner.tables();
        tables.access_points.retain(|ap| &ap.reference != reference);
        let stored: Vec<AccessPoint> = access_points
            .into_iter()
            .map(|ap| AccessPoint {
                id: new_id(),
                reference: reference.clone(),
                target: ap.target,
                host: ap.host,
                secured: ap.secured,
                overriding: ap.overriding,
            })
            .collect();
        tables.access_points.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn delete_by_reference(&self, reference: &Reference) -> KeelResult<Vec<String>> {
        self.inner.record(Call::DeleteAccessPoints(reference.clone()));
        let mut tables = self.inner.tables();
        let ids = tables
            .access_points
            .iter()
            .filter(|ap| &ap.reference == reference)
            .map(|ap| ap.id.clone())
            .collect();
        tables.access_points.retain(|ap| &ap.reference != reference);
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Generic owned collections
// ---------------------------------------------------------------------------

/// Remove the rows of `rows` matching `owned` and return their ids.
fn drain_ids<T>(rows: &mut Vec<T>, owned: impl Fn(&T) -> bool, id: impl Fn(&T) -> &str) -> Vec<String> {
    let ids = rows
        .iter()
        .filter(|r| owned(r))
        .map(|r| id(r).to_string())
        .collect();
    rows.retain(|r| !owned(r));
    ids
}

fn typed_collection(collection: Collection) -> KeelError {
    KeelError::Validation {
        message: format!("{collection} is not a generic collection"),
    }
}

impl OwnedRecordRepository for MemRecords {
    async fn insert(&self, collection: Collection, input: CreateOwnedRecord) -> KeelResult<OwnedRecord> {
        if collection.is_typed() {
            return Err(typed_collection(collection));
        }
        let record = OwnedRecord {
            id: input.id.unwrap_or_else(new_id),
            collection,
            reference: input.reference,
            name: input.name,
            state: input.state,
            created_at: Utc::now(),
        };
        self.inner.tables().records.push(record.clone());
        Ok(record)
    }

    async fn find_by_reference(
        &self,
        collection: Collection,
        reference: &Reference,
    ) -> KeelResult<Vec<OwnedRecord>> {
        if collection.is_typed() {
            return Err(typed_collection(collection));
        }
        Ok(self
            .inner
            .tables()
            .records
            .iter()
            .filter(|r| r.collection == collection && &r.reference == reference)
            .cloned()
            .collect())
    }

    async fn set_state(&self, collection: Collection, id: &str, state: &str) -> KeelResult<()> {
        let mut tables = self.inner.tables();
        let record = tables
            .records
            .iter_mut()
            .find(|r| r.collection == collection && r.id == id)
            .ok_or_else(|| KeelError::not_found(collection.table(), id))?;
        record.state = Some(state.to_string());
        Ok(())
    }

    async fn delete_by_reference(
        &self,
        collection: Collection,
        reference: &Reference,
    ) -> KeelResult<Vec<String>> {
        self.inner.record(Call::DeleteRecords {
            collection,
            reference: reference.clone(),
        });
        self.inner.check(Fault::DeleteRecords(collection))?;

        let mut tables = self.inner.tables();
        let owner = reference.reference_id.as_str();
        let org_owned = reference.reference_type == ReferenceType::Organization;
        let ids = match collection {
            Collection::Environment => drain_ids(
                &mut tables.environments,
                |e| org_owned && e.organization_id == owner,
                |e| e.id.as_str(),
            ),
            Collection::User => drain_ids(
                &mut tables.users,
                |u| org_owned && u.organization_id == owner,
                |u| u.id.as_str(),
            ),
            Collection::Role => drain_ids(
                &mut tables.roles,
                |r| org_owned && r.organization_id == owner,
                |r| r.id.as_str(),
            ),
            Collection::Membership => {
                drain_ids(&mut tables.memberships, |m| &m.reference == reference, |m| m.id.as_str())
            }
            Collection::Token => drain_ids(
                &mut tables.tokens,
                |t| reference.reference_type == ReferenceType::User && t.user_id == owner,
                |t| t.id.as_str(),
            ),
            Collection::AccessPoint => {
                drain_ids(&mut tables.access_points, |ap| &ap.reference == reference, |ap| ap.id.as_str())
            }
            generic => drain_ids(
                &mut tables.records,
                |r| r.collection == generic && &r.reference == reference,
                |r| r.id.as_str(),
            ),
        };
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Runtime & search
// ---------------------------------------------------------------------------

impl MemRuntime {
    fn running(&self, ctx: &ExecutionContext, collection: Collection, started_only: bool) -> Vec<String> {
        let Some(environment_id) = ctx.environment_id.as_deref() else {
            return Vec::new();
        };
        let reference = Reference::environment(environment_id);
        self.inner
            .tables()
            .records
            .iter()
            .filter(|r| r.collection == collection && r.reference == reference)
            .filter(|r| !started_only || r.state.as_deref() == Some(STATE_STARTED))
            .map(|r| r.id.clone())
            .collect()
    }

    fn stop(&self, collection: Collection, id: &str) {
        let mut tables = self.inner.tables();
        if let Some(record) = tables
            .records
            .iter_mut()
            .find(|r| r.collection == collection && r.id == id)
        {
            record.state = Some(STATE_STOPPED.to_string());
        }
    }
}

impl RuntimeService for MemRuntime {
    async fn started_apis(&self, ctx: &ExecutionContext) -> KeelResult<Vec<String>> {
        Ok(self.running(ctx, Collection::Api, true))
    }

    async fn stop_api(&self, _ctx: &ExecutionContext, api_id: &str) -> KeelResult<()> {
        self.inner.record(Call::StopApi(api_id.to_string()));
        self.inner.check(Fault::StopApi)?;
        self.stop(Collection::Api, api_id);
        Ok(())
    }

    async fn dictionaries(&self, ctx: &ExecutionContext) -> KeelResult<Vec<String>> {
        Ok(self.running(ctx, Collection::Dictionary, false))
    }

    async fn stop_dictionary(&self, _ctx: &ExecutionContext, dictionary_id: &str) -> KeelResult<()> {
        self.inner.record(Call::StopDictionary(dictionary_id.to_string()));
        self.stop(Collection::Dictionary, dictionary_id);
        Ok(())
    }
}

impl SearchIndex for MemSearch {
    async fn remove(&self, _ctx: &ExecutionContext, kind: IndexedKind, id: &str) -> KeelResult<()> {
        self.inner.record(Call::Unindex(kind, id.to_string()));
        self.inner.check(Fault::Unindex)?;
        self.inner
            .tables()
            .search
            .retain(|(k, i)| !(*k == kind && i == id));
        Ok(())
    }
}
