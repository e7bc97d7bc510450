use std::sync::Arc;

use keel_core::repository::{EnvironmentRepository, OrganizationRepository, Store};
use serde_json::json;
use tracing::info;

use super::orchestrator::CascadeOrchestrator;
use crate::command::{Command, CommandType, Reply, ReplyStatus};
use crate::error::{CommandError, CommandResult};
use crate::handler::{CommandHandler, reply_for};
use crate::payload::AggregatePayload;

/// The teardown operation a [`TeardownHandler`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    DisableOrganization,
    DisableEnvironment,
    DeleteOrganization,
    DeleteEnvironment,
}

impl Teardown {
    pub const ALL: [Teardown; 4] = [
        Teardown::DisableOrganization,
        Teardown::DisableEnvironment,
        Teardown::DeleteOrganization,
        Teardown::DeleteEnvironment,
    ];

    fn command_type(&self) -> CommandType {
        match self {
            Self::DisableOrganization => CommandType::DisableOrganization,
            Self::DisableEnvironment => CommandType::DisableEnvironment,
            Self::DeleteOrganization => CommandType::DeleteOrganization,
            Self::DeleteEnvironment => CommandType::DeleteEnvironment,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::DisableOrganization => "disabling organization",
            Self::DisableEnvironment => "disabling environment",
            Self::DeleteOrganization => "deleting organization",
            Self::DeleteEnvironment => "deleting environment",
        }
    }
}

/// Handles the delete and disable commands. The payload carries the
/// controller id of the aggregate; an aggregate that cannot be found is
/// treated as already gone.
pub struct TeardownHandler<S: Store> {
    store: Arc<S>,
    orchestrator: Arc<CascadeOrchestrator<S>>,
    teardown: Teardown,
}

impl<S: Store> TeardownHandler<S> {
    pub fn new(
        store: Arc<S>,
        orchestrator: Arc<CascadeOrchestrator<S>>,
        teardown: Teardown,
    ) -> Self {
        Self {
            store,
            orchestrator,
            teardown,
        }
    }

    async fn run(&self, cockpit_id: &str) -> CommandResult<Option<serde_json::Value>> {
        match self.teardown {
            Teardown::DisableEnvironment | Teardown::DeleteEnvironment => {
                let Some(environment) = self
                    .store
                    .environments()
                    .find_by_cockpit_id(cockpit_id)
                    .await?
                else {
                    info!(cockpit_id, "environment not found, nothing to do");
                    return Ok(None);
                };
                if self.teardown == Teardown::DisableEnvironment {
                    self.orchestrator.disable_environment(&environment).await?;
                    return Ok(None);
                }
                let report = self.orchestrator.delete_environment(&environment).await?;
                Ok(Some(json!({ "deleted": report.total() })))
            }
            Teardown::DisableOrganization | Teardown::DeleteOrganization => {
                let Some(organization) = self
                    .store
                    .organizations()
                    .find_by_cockpit_id(cockpit_id)
                    .await?
                else {
                    info!(cockpit_id, "organization not found, nothing to do");
                    return Ok(None);
                };
                if self.teardown == Teardown::DisableOrganization {
                    self.orchestrator.disable_organization(&organization).await?;
                    return Ok(None);
                }
                let report = self.orchestrator.delete_organization(&organization).await?;
                Ok(Some(json!({ "deleted": report.total() })))
            }
        }
    }
}

impl<S: Store> CommandHandler for TeardownHandler<S> {
    fn command_type(&self) -> CommandType {
        self.teardown.command_type()
    }

    async fn handle(&self, command: Command) -> Reply {
        let payload: AggregatePayload = match command.payload() {
            Ok(payload) => payload,
            Err(err) => return reply_for(&command, "", Err(err)),
        };
        let outcome = self.run(&payload.id).await.map_err(|err| {
            if err.status() == ReplyStatus::Failed {
                return err;
            }
            CommandError::Aborted {
                message: format!(
                    "Error occurred when {} with id [{}]: {err}",
                    self.teardown.describe(),
                    payload.id
                ),
            }
        });
        reply_for(&command, &payload.id, outcome)
    }
}
