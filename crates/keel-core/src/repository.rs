//! Collaborator contracts consumed by the command layer.
//!
//! All operations are async. Lookups that may legitimately miss return
//! `Option`; `get_*` operations return [`KeelError::NotFound`] instead.
//! Bulk deletes by owner return the ids they removed and are no-ops on an
//! empty set, which is what makes a re-run cascade converge.
//!
//! [`KeelError::NotFound`]: crate::error::KeelError::NotFound

use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::KeelResult;
use crate::models::{
    access_point::{AccessPoint, AccessPointTarget, NewAccessPoint},
    environment::{CreateEnvironment, Environment, UpdateEnvironment},
    membership::{CreateMembership, Member, Membership},
    organization::{CreateOrganization, Organization, UpdateOrganization},
    record::{CreateOwnedRecord, OwnedRecord},
    reference::{Collection, Reference},
    role::{CreateRole, Role, RoleScope},
    token::{CreateToken, Token},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Aggregate roots
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = KeelResult<Organization>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = KeelResult<Organization>> + Send;
    fn find_by_cockpit_id(
        &self,
        cockpit_id: &str,
    ) -> impl Future<Output = KeelResult<Option<Organization>>> + Send;
    fn update(
        &self,
        id: &str,
        input: UpdateOrganization,
    ) -> impl Future<Output = KeelResult<Organization>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = KeelResult<()>> + Send;
}

pub trait EnvironmentRepository: Send + Sync {
    fn create(
        &self,
        input: CreateEnvironment,
    ) -> impl Future<Output = KeelResult<Environment>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = KeelResult<Environment>> + Send;
    fn find_by_cockpit_id(
        &self,
        cockpit_id: &str,
    ) -> impl Future<Output = KeelResult<Option<Environment>>> + Send;
    fn update(
        &self,
        id: &str,
        input: UpdateEnvironment,
    ) -> impl Future<Output = KeelResult<Environment>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = KeelResult<()>> + Send;
    fn list_by_organization(
        &self,
        organization_id: &str,
    ) -> impl Future<Output = KeelResult<Vec<Environment>>> + Send;
}

// ---------------------------------------------------------------------------
// Identity & access
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = KeelResult<User>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = KeelResult<User>> + Send;
    fn find_by_source(
        &self,
        organization_id: &str,
        source: &str,
        source_id: &str,
    ) -> impl Future<Output = KeelResult<Option<User>>> + Send;
    fn update(&self, id: &str, input: UpdateUser) -> impl Future<Output = KeelResult<User>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = KeelResult<()>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = KeelResult<Role>> + Send;
    /// Roles are defined per organization; `None` when the organization
    /// has no role with that scope and name.
    fn find_by_scope_and_name(
        &self,
        scope: RoleScope,
        name: &str,
        organization_id: &str,
    ) -> impl Future<Output = KeelResult<Option<Role>>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    fn create(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = KeelResult<Membership>> + Send;
    fn find_by_member(
        &self,
        member: &Member,
    ) -> impl Future<Output = KeelResult<Vec<Membership>>> + Send;
    fn find_by_reference_and_member(
        &self,
        reference: &Reference,
        member: &Member,
    ) -> impl Future<Output = KeelResult<Vec<Membership>>> + Send;
    /// Replace every role the member holds on `reference` with `roles`.
    fn replace_roles(
        &self,
        reference: &Reference,
        member: &Member,
        roles: &[Role],
        source: Option<&str>,
    ) -> impl Future<Output = KeelResult<Vec<Membership>>> + Send;
    /// Remove every membership of the member, on any reference.
    /// Returns the number of memberships removed.
    fn delete_by_member(&self, member: &Member) -> impl Future<Output = KeelResult<u64>> + Send;
}

pub trait TokenRepository: Send + Sync {
    fn create(&self, input: CreateToken) -> impl Future<Output = KeelResult<Token>> + Send;
    fn find_by_user(&self, user_id: &str) -> impl Future<Output = KeelResult<Vec<Token>>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = KeelResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Access points
// ---------------------------------------------------------------------------

pub trait AccessPointRepository: Send + Sync {
    fn find_by_reference(
        &self,
        reference: &Reference,
    ) -> impl Future<Output = KeelResult<Vec<AccessPoint>>> + Send;
    fn find_by_reference_and_target(
        &self,
        reference: &Reference,
        target: AccessPointTarget,
    ) -> impl Future<Output = KeelResult<Vec<AccessPoint>>> + Send;
    fn find_by_host(
        &self,
        host: &str,
    ) -> impl Future<Output = KeelResult<Option<AccessPoint>>> + Send;
    /// Drop the stored set for `reference` and write `access_points` in
    /// its place, preserving their order.
    fn replace(
        &self,
        reference: &Reference,
        access_points: Vec<NewAccessPoint>,
    ) -> impl Future<Output = KeelResult<Vec<AccessPoint>>> + Send;
    fn delete_by_reference(
        &self,
        reference: &Reference,
    ) -> impl Future<Output = KeelResult<Vec<String>>> + Send;
}

// ---------------------------------------------------------------------------
// Generic owned collections
// ---------------------------------------------------------------------------

pub trait OwnedRecordRepository: Send + Sync {
    fn insert(
        &self,
        collection: Collection,
        input: CreateOwnedRecord,
    ) -> impl Future<Output = KeelResult<OwnedRecord>> + Send;
    fn find_by_reference(
        &self,
        collection: Collection,
        reference: &Reference,
    ) -> impl Future<Output = KeelResult<Vec<OwnedRecord>>> + Send;
    fn set_state(
        &self,
        collection: Collection,
        id: &str,
        state: &str,
    ) -> impl Future<Output = KeelResult<()>> + Send;
    /// Delete every record of `collection` owned by `reference` and return
    /// their ids. Works on typed collections too (users of an
    /// organization, memberships on a group, ...).
    fn delete_by_reference(
        &self,
        collection: Collection,
        reference: &Reference,
    ) -> impl Future<Output = KeelResult<Vec<String>>> + Send;
}

// ---------------------------------------------------------------------------
// Runtime & search services
// ---------------------------------------------------------------------------

/// Stops workloads before their definitions are removed.
pub trait RuntimeService: Send + Sync {
    /// Ids of the environment's apis currently deployed.
    fn started_apis(
        &self,
        ctx: &ExecutionContext,
    ) -> impl Future<Output = KeelResult<Vec<String>>> + Send;
    fn stop_api(
        &self,
        ctx: &ExecutionContext,
        api_id: &str,
    ) -> impl Future<Output = KeelResult<()>> + Send;
    /// Ids of the environment's dictionaries.
    fn dictionaries(
        &self,
        ctx: &ExecutionContext,
    ) -> impl Future<Output = KeelResult<Vec<String>>> + Send;
    fn stop_dictionary(
        &self,
        ctx: &ExecutionContext,
        dictionary_id: &str,
    ) -> impl Future<Output = KeelResult<()>> + Send;
}

/// Kind of document held by the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexedKind {
    Api,
    Page,
}

impl IndexedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::Page => "PAGE",
        }
    }
}

pub trait SearchIndex: Send + Sync {
    /// Remove a document; removing an absent document is not an error.
    fn remove(
        &self,
        ctx: &ExecutionContext,
        kind: IndexedKind,
        id: &str,
    ) -> impl Future<Output = KeelResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// One implementation of every collaborator, handed to the handlers.
pub trait Store: Send + Sync + 'static {
    type Organizations: OrganizationRepository;
    type Environments: EnvironmentRepository;
    type Users: UserRepository;
    type Roles: RoleRepository;
    type Memberships: MembershipRepository;
    type Tokens: TokenRepository;
    type AccessPoints: AccessPointRepository;
    type Records: OwnedRecordRepository;
    type Runtime: RuntimeService;
    type Search: SearchIndex;

    fn organizations(&self) -> &Self::Organizations;
    fn environments(&self) -> &Self::Environments;
    fn users(&self) -> &Self::Users;
    fn roles(&self) -> &Self::Roles;
    fn memberships(&self) -> &Self::Memberships;
    fn tokens(&self) -> &Self::Tokens;
    fn access_points(&self) -> &Self::AccessPoints;
    fn records(&self) -> &Self::Records;
    fn runtime(&self) -> &Self::Runtime;
    fn search(&self) -> &Self::Search;
}
