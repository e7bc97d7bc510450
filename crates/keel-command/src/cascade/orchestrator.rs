//! Two-phase teardown: disable, then delete.
//!
//! Nothing here is transactional. The delete phase stops at the first
//! error and keeps whatever it already removed; running it again finishes
//! the job because every bulk delete on an empty set is a no-op.

use std::collections::BTreeMap;
use std::sync::Arc;

use keel_core::ExecutionContext;
use keel_core::models::environment::Environment;
use keel_core::models::organization::Organization;
use keel_core::models::reference::{Collection, Reference, ReferenceType};
use keel_core::repository::{
    AccessPointRepository, EnvironmentRepository, OrganizationRepository, OwnedRecordRepository,
    RuntimeService, SearchIndex, Store,
};
use tracing::{debug, info};

use super::graph::{CascadeGraph, DeletionPlan, GraphError, PlanStep};
use crate::error::{CommandError, CommandResult};

/// Number of records removed per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub deleted: BTreeMap<Collection, usize>,
    pub unindexed: usize,
}

impl DeletionReport {
    pub fn total(&self) -> usize {
        self.deleted.values().sum()
    }

    fn record(&mut self, collection: Collection, count: usize) {
        *self.deleted.entry(collection).or_default() += count;
    }
}

pub struct CascadeOrchestrator<S: Store> {
    store: Arc<S>,
    environment_plan: DeletionPlan,
    organization_plan: DeletionPlan,
}

impl<S: Store> CascadeOrchestrator<S> {
    /// Derives both deletion plans up front; a cyclic graph is refused.
    pub fn new(store: Arc<S>, graph: &CascadeGraph) -> Result<Self, GraphError> {
        graph.validate()?;
        Ok(Self {
            store,
            environment_plan: graph.plan(ReferenceType::Environment)?,
            organization_plan: graph.plan(ReferenceType::Organization)?,
        })
    }

    /// Stop the environment's workloads and cut its routes.
    pub async fn disable_environment(&self, environment: &Environment) -> CommandResult<()> {
        let ctx = ExecutionContext::environment(&environment.organization_id, &environment.id);
        let reference = Reference::environment(&environment.id);

        let runtime = self.store.runtime();
        let started = runtime.started_apis(&ctx).await?;
        for api_id in &started {
            runtime.stop_api(&ctx, api_id).await?;
        }

        self.store
            .access_points()
            .delete_by_reference(&reference)
            .await?;
        self.store
            .records()
            .delete_by_reference(Collection::IdentityProviderActivation, &reference)
            .await?;

        let dictionaries = runtime.dictionaries(&ctx).await?;
        for dictionary_id in &dictionaries {
            runtime.stop_dictionary(&ctx, dictionary_id).await?;
        }

        info!(
            environment_id = %environment.id,
            stopped_apis = started.len(),
            stopped_dictionaries = dictionaries.len(),
            "environment disabled"
        );
        Ok(())
    }

    /// Disable every environment of the organization, then the
    /// organization's own routes.
    pub async fn disable_organization(&self, organization: &Organization) -> CommandResult<()> {
        let environments = self
            .store
            .environments()
            .list_by_organization(&organization.id)
            .await?;
        for environment in &environments {
            self.disable_environment(environment).await?;
        }

        let reference = Reference::organization(&organization.id);
        self.store
            .access_points()
            .delete_by_reference(&reference)
            .await?;
        self.store
            .records()
            .delete_by_reference(Collection::IdentityProviderActivation, &reference)
            .await?;

        info!(organization_id = %organization.id, "organization disabled");
        Ok(())
    }

    pub async fn delete_environment(&self, environment: &Environment) -> CommandResult<DeletionReport> {
        self.disable_environment(environment).await?;

        let ctx = ExecutionContext::environment(&environment.organization_id, &environment.id);
        let report = self
            .walk(&ctx, &self.environment_plan, Reference::environment(&environment.id))
            .await?;

        match self.store.environments().delete(&environment.id).await {
            Err(err) if !err.is_not_found() => return Err(err.into()),
            _ => {}
        }
        info!(
            environment_id = %environment.id,
            deleted = report.total(),
            "environment deleted"
        );
        Ok(report)
    }

    /// Refused while the organization still has environments.
    pub async fn delete_organization(
        &self,
        organization: &Organization,
    ) -> CommandResult<DeletionReport> {
        let remaining = self
            .store
            .environments()
            .list_by_organization(&organization.id)
            .await?
            .len();
        if remaining > 0 {
            return Err(CommandError::rejected(format!(
                "Organization [{}] still has {remaining} environment(s), delete them first",
                organization.id
            )));
        }

        self.disable_organization(organization).await?;

        let ctx = ExecutionContext::organization(&organization.id);
        let report = self
            .walk(&ctx, &self.organization_plan, Reference::organization(&organization.id))
            .await?;

        match self.store.organizations().delete(&organization.id).await {
            Err(err) if !err.is_not_found() => return Err(err.into()),
            _ => {}
        }
        info!(
            organization_id = %organization.id,
            deleted = report.total(),
            "organization deleted"
        );
        Ok(report)
    }

    /// Depth-first walk of `plan`: each deleted mid-level record has its
    /// own dependents cleared before the next collection of its parent.
    async fn walk(
        &self,
        ctx: &ExecutionContext,
        plan: &DeletionPlan,
        root: Reference,
    ) -> CommandResult<DeletionReport> {
        let records = self.store.records();
        let search = self.store.search();
        let mut report = DeletionReport::default();

        let mut pending: Vec<(&PlanStep, Reference)> =
            plan.steps.iter().rev().map(|step| (step, root.clone())).collect();

        while let Some((step, owner)) = pending.pop() {
            match step {
                PlanStep::Delete { collection, then } => {
                    let ids = records.delete_by_reference(*collection, &owner).await?;
                    debug!(
                        %owner,
                        %collection,
                        deleted = ids.len(),
                        "collection cleared"
                    );
                    report.record(*collection, ids.len());

                    if let Some(child) = then {
                        for id in ids.iter().rev() {
                            let child_owner = Reference::new(child.owner, id);
                            for child_step in child.steps.iter().rev() {
                                pending.push((child_step, child_owner.clone()));
                            }
                        }
                    }
                }
                PlanStep::Unindex(kind) => {
                    search.remove(ctx, *kind, &owner.reference_id).await?;
                    report.unindexed += 1;
                }
            }
        }
        Ok(report)
    }
}
