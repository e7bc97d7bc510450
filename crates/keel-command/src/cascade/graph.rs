//! Declarative ownership graph driving cascading deletion.
//!
//! Each owner type lists, in order, the collections it owns. A collection
//! whose records own records of their own names the reference type its
//! deleted ids cascade as. [`CascadeGraph::plan`] turns the graph into the
//! ordered walk the orchestrator executes, and refuses cyclic graphs.

use std::collections::{BTreeMap, BTreeSet};

use keel_core::models::reference::{Collection, ReferenceType};
use keel_core::repository::IndexedKind;
use thiserror::Error;

/// Something removed when its owner is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependent {
    /// Bulk delete of the owner's records in `collection`. When `cascade`
    /// is set, every deleted id is in turn walked as an owner of that type.
    Collection {
        collection: Collection,
        cascade: Option<ReferenceType>,
    },
    /// Drop the owner's own search-index document.
    SearchIndex(IndexedKind),
}

impl Dependent {
    pub const fn leaf(collection: Collection) -> Self {
        Self::Collection {
            collection,
            cascade: None,
        }
    }

    pub const fn owner(collection: Collection, cascade: ReferenceType) -> Self {
        Self::Collection {
            collection,
            cascade: Some(cascade),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("cascade cycle through {0}")]
    Cycle(ReferenceType),
}

#[derive(Debug, Clone, Default)]
pub struct CascadeGraph {
    edges: BTreeMap<ReferenceType, Vec<Dependent>>,
}

impl CascadeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ordered dependents of `owner`.
    pub fn with(mut self, owner: ReferenceType, dependents: impl Into<Vec<Dependent>>) -> Self {
        self.edges.insert(owner, dependents.into());
        self
    }

    pub fn dependents(&self, owner: ReferenceType) -> &[Dependent] {
        self.edges.get(&owner).map(Vec::as_slice).unwrap_or_default()
    }

    /// Reject graphs in which an owner type can reach itself.
    pub fn validate(&self) -> Result<(), GraphError> {
        for owner in self.edges.keys() {
            self.visit(*owner, &mut BTreeSet::new())?;
        }
        Ok(())
    }

    fn visit(
        &self,
        owner: ReferenceType,
        path: &mut BTreeSet<ReferenceType>,
    ) -> Result<(), GraphError> {
        if !path.insert(owner) {
            return Err(GraphError::Cycle(owner));
        }
        for dependent in self.dependents(owner) {
            if let Dependent::Collection {
                cascade: Some(child),
                ..
            } = dependent
            {
                self.visit(*child, path)?;
            }
        }
        path.remove(&owner);
        Ok(())
    }

    /// The ordered walk for deleting everything an owner of type `root`
    /// owns. The root record itself is not part of the plan.
    pub fn plan(&self, root: ReferenceType) -> Result<DeletionPlan, GraphError> {
        self.build(root, &mut BTreeSet::new())
    }

    fn build(
        &self,
        owner: ReferenceType,
        path: &mut BTreeSet<ReferenceType>,
    ) -> Result<DeletionPlan, GraphError> {
        if !path.insert(owner) {
            return Err(GraphError::Cycle(owner));
        }
        let mut steps = Vec::new();
        for dependent in self.dependents(owner) {
            steps.push(match *dependent {
                Dependent::Collection {
                    collection,
                    cascade,
                } => PlanStep::Delete {
                    collection,
                    then: cascade
                        .map(|child| self.build(child, path))
                        .transpose()?,
                },
                Dependent::SearchIndex(kind) => PlanStep::Unindex(kind),
            });
        }
        path.remove(&owner);
        Ok(DeletionPlan { owner, steps })
    }

    /// Ownership of everything an organization or environment holds.
    pub fn standard() -> Self {
        use Collection as C;
        use ReferenceType as R;

        Self::new()
            .with(
                R::Organization,
                [
                    Dependent::leaf(C::AccessPoint),
                    Dependent::leaf(C::Flow),
                    Dependent::leaf(C::IdentityProviderActivation),
                    Dependent::leaf(C::IdentityProvider),
                    Dependent::leaf(C::Parameter),
                    Dependent::leaf(C::Membership),
                    Dependent::leaf(C::Role),
                    Dependent::owner(C::User, R::User),
                    Dependent::leaf(C::Command),
                    Dependent::leaf(C::CustomUserField),
                    Dependent::leaf(C::Entrypoint),
                    Dependent::leaf(C::NotificationTemplate),
                    Dependent::leaf(C::Tag),
                    Dependent::leaf(C::Tenant),
                    Dependent::leaf(C::Theme),
                    Dependent::leaf(C::Audit),
                ],
            )
            .with(
                R::Environment,
                [
                    Dependent::owner(C::Api, R::Api),
                    Dependent::owner(C::Application, R::Application),
                    Dependent::owner(C::Page, R::Page),
                    Dependent::leaf(C::Subscription),
                    Dependent::leaf(C::ApiKey),
                    Dependent::owner(C::Plan, R::Plan),
                    Dependent::leaf(C::Alert),
                    Dependent::leaf(C::ApiHeader),
                    Dependent::leaf(C::AccessPoint),
                    Dependent::leaf(C::Parameter),
                    Dependent::leaf(C::PortalMenuLink),
                    Dependent::leaf(C::CustomUserField),
                    Dependent::owner(C::Group, R::Group),
                    Dependent::leaf(C::Membership),
                    Dependent::leaf(C::Category),
                    Dependent::leaf(C::Dashboard),
                    Dependent::leaf(C::Dictionary),
                    Dependent::leaf(C::Event),
                    Dependent::leaf(C::ScoringRuleset),
                    Dependent::leaf(C::PortalNotificationConfig),
                    Dependent::leaf(C::GenericNotificationConfig),
                    Dependent::leaf(C::SharedPolicyGroupHistory),
                    Dependent::leaf(C::SharedPolicyGroup),
                    Dependent::leaf(C::Theme),
                    Dependent::leaf(C::IdentityProviderActivation),
                    Dependent::leaf(C::Command),
                    Dependent::owner(C::Integration, R::Integration),
                    Dependent::leaf(C::AsyncJob),
                    Dependent::leaf(C::Media),
                    Dependent::leaf(C::Metadata),
                    Dependent::leaf(C::Audit),
                ],
            )
            .with(
                R::Api,
                [
                    Dependent::SearchIndex(IndexedKind::Api),
                    Dependent::leaf(C::Alert),
                    Dependent::leaf(C::Event),
                    Dependent::owner(C::Page, R::Page),
                    Dependent::leaf(C::ApiCategoryOrder),
                    Dependent::leaf(C::ApiQualityRule),
                    Dependent::leaf(C::Audit),
                    Dependent::leaf(C::Flow),
                    Dependent::leaf(C::GenericNotificationConfig),
                    Dependent::leaf(C::Invitation),
                    Dependent::leaf(C::Media),
                    Dependent::leaf(C::Membership),
                    Dependent::leaf(C::Metadata),
                    Dependent::leaf(C::PortalNotificationConfig),
                    Dependent::leaf(C::ScoringReport),
                    Dependent::leaf(C::Workflow),
                    Dependent::owner(C::Rating, R::Rating),
                ],
            )
            .with(
                R::Application,
                [
                    Dependent::leaf(C::Alert),
                    Dependent::leaf(C::GenericNotificationConfig),
                    Dependent::leaf(C::Invitation),
                    Dependent::leaf(C::Membership),
                    Dependent::leaf(C::Metadata),
                    Dependent::leaf(C::PortalNotificationConfig),
                    Dependent::leaf(C::Workflow),
                    Dependent::leaf(C::Audit),
                ],
            )
            .with(
                R::Page,
                [
                    Dependent::SearchIndex(IndexedKind::Page),
                    Dependent::leaf(C::PageRevision),
                ],
            )
            .with(R::Plan, [Dependent::leaf(C::Flow)])
            .with(
                R::Group,
                [Dependent::leaf(C::Membership), Dependent::leaf(C::Invitation)],
            )
            .with(R::Rating, [Dependent::leaf(C::RatingAnswer)])
            .with(R::Integration, [Dependent::leaf(C::Membership)])
            .with(
                R::User,
                [
                    Dependent::leaf(C::Token),
                    Dependent::leaf(C::Metadata),
                    Dependent::leaf(C::PortalNotificationConfig),
                    Dependent::leaf(C::GenericNotificationConfig),
                ],
            )
    }
}

/// One step of a [`DeletionPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Delete the owner's records in `collection`, then walk `then` for
    /// each deleted id.
    Delete {
        collection: Collection,
        then: Option<DeletionPlan>,
    },
    Unindex(IndexedKind),
}

/// The ordered steps for clearing out one owner of type `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    pub owner: ReferenceType,
    pub steps: Vec<PlanStep>,
}

impl DeletionPlan {
    /// Depth-first listing of the plan as `owner/collection` paths, the
    /// order in which a single owner at every level is processed.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for step in &self.steps {
            match step {
                PlanStep::Delete { collection, then } => {
                    let path = format!("{prefix}{collection}");
                    out.push(path.clone());
                    if let Some(child) = then {
                        child.collect_paths(&format!("{path}/"), out);
                    }
                }
                PlanStep::Unindex(kind) => out.push(format!("{prefix}search:{}", kind.as_str())),
            }
        }
    }
}
