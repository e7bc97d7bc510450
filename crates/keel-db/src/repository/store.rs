//! [`Store`] bundle over one SurrealDB connection.

use keel_core::repository::Store;
use surrealdb::{Connection, Surreal};

use super::{
    SurrealAccessPointRepository, SurrealEnvironmentRepository, SurrealMembershipRepository,
    SurrealOrganizationRepository, SurrealOwnedRecordRepository, SurrealRoleRepository,
    SurrealRuntimeService, SurrealSearchIndex, SurrealTokenRepository, SurrealUserRepository,
};

/// Every repository the command layer needs, sharing one client.
pub struct SurrealStore<C: Connection> {
    organizations: SurrealOrganizationRepository<C>,
    environments: SurrealEnvironmentRepository<C>,
    users: SurrealUserRepository<C>,
    roles: SurrealRoleRepository<C>,
    memberships: SurrealMembershipRepository<C>,
    tokens: SurrealTokenRepository<C>,
    access_points: SurrealAccessPointRepository<C>,
    records: SurrealOwnedRecordRepository<C>,
    runtime: SurrealRuntimeService<C>,
    search: SurrealSearchIndex<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            organizations: SurrealOrganizationRepository::new(db.clone()),
            environments: SurrealEnvironmentRepository::new(db.clone()),
            users: SurrealUserRepository::new(db.clone()),
            roles: SurrealRoleRepository::new(db.clone()),
            memberships: SurrealMembershipRepository::new(db.clone()),
            tokens: SurrealTokenRepository::new(db.clone()),
            access_points: SurrealAccessPointRepository::new(db.clone()),
            records: SurrealOwnedRecordRepository::new(db.clone()),
            runtime: SurrealRuntimeService::new(db.clone()),
            search: SurrealSearchIndex::new(db),
        }
    }
}

impl<C: Connection> Store for SurrealStore<C> {
    type Organizations = SurrealOrganizationRepository<C>;
    type Environments = SurrealEnvironmentRepository<C>;
    type Users = SurrealUserRepository<C>;
    type Roles = SurrealRoleRepository<C>;
    type Memberships = SurrealMembershipRepository<C>;
    type Tokens = SurrealTokenRepository<C>;
    type AccessPoints = SurrealAccessPointRepository<C>;
    type Records = SurrealOwnedRecordRepository<C>;
    type Runtime = SurrealRuntimeService<C>;
    type Search = SurrealSearchIndex<C>;

    fn organizations(&self) -> &Self::Organizations {
        &self.organizations
    }
    fn environments(&self) -> &Self::Environments {
        &self.environments
    }
    fn users(&self) -> &Self::Users {
        &self.users
    }
    fn roles(&self) -> &Self::Roles {
        &self.roles
    }
    fn memberships(&self) -> &Self::Memberships {
        &self.memberships
    }
    fn tokens(&self) -> &Self::Tokens {
        &self.tokens
    }
    fn access_points(&self) -> &Self::AccessPoints {
        &self.access_points
    }
    fn records(&self) -> &Self::Records {
        &self.records
    }
    fn runtime(&self) -> &Self::Runtime {
        &self.runtime
    }
    fn search(&self) -> &Self::Search {
        &self.search
    }
}
