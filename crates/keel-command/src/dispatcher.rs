//! Routes commands to their handler.

use std::sync::Arc;

use keel_core::repository::Store;
use tracing::{Instrument, info_span, warn};

use crate::cascade::{CascadeGraph, CascadeOrchestrator, GraphError, Teardown, TeardownHandler};
use crate::command::{Command, CommandType, Reply};
use crate::config::CommandSettings;
use crate::handler::CommandHandler;
use crate::provisioning::TargetTokenHandler;
use crate::sync::{
    EnvironmentSyncHandler, MembershipSyncHandler, OrganizationSyncHandler, UserSyncHandler,
};

/// One handler per supported [`CommandType`], all sharing the same store.
pub struct Dispatcher<S: Store> {
    organization: OrganizationSyncHandler<S>,
    environment: EnvironmentSyncHandler<S>,
    user: UserSyncHandler<S>,
    membership: MembershipSyncHandler<S>,
    target_token: TargetTokenHandler<S>,
    disable_organization: TeardownHandler<S>,
    disable_environment: TeardownHandler<S>,
    delete_organization: TeardownHandler<S>,
    delete_environment: TeardownHandler<S>,
}

impl<S: Store> Dispatcher<S> {
    /// Dispatcher over the standard ownership graph.
    pub fn new(store: Arc<S>, settings: CommandSettings) -> Result<Self, GraphError> {
        Self::with_graph(store, settings, &CascadeGraph::standard())
    }

    pub fn with_graph(
        store: Arc<S>,
        settings: CommandSettings,
        graph: &CascadeGraph,
    ) -> Result<Self, GraphError> {
        let orchestrator = Arc::new(CascadeOrchestrator::new(store.clone(), graph)?);
        let teardown = |kind| TeardownHandler::new(store.clone(), orchestrator.clone(), kind);

        Ok(Self {
            disable_organization: teardown(Teardown::DisableOrganization),
            disable_environment: teardown(Teardown::DisableEnvironment),
            delete_organization: teardown(Teardown::DeleteOrganization),
            delete_environment: teardown(Teardown::DeleteEnvironment),
            organization: OrganizationSyncHandler::new(store.clone()),
            environment: EnvironmentSyncHandler::new(store.clone()),
            user: UserSyncHandler::new(store.clone(), settings.sync.clone()),
            membership: MembershipSyncHandler::new(store.clone(), settings.sync),
            target_token: TargetTokenHandler::new(store, settings.token),
        })
    }

    /// Produce the reply for `command`. Never fails.
    pub async fn dispatch(&self, command: Command) -> Reply {
        let span = info_span!(
            "command",
            command_id = %command.id,
            command_type = %command.command_type
        );
        async move {
            match command.command_type {
                CommandType::Organization => self.organization.handle(command).await,
                CommandType::Environment => self.environment.handle(command).await,
                CommandType::User => self.user.handle(command).await,
                CommandType::Membership => self.membership.handle(command).await,
                CommandType::TargetToken => self.target_token.handle(command).await,
                CommandType::DisableOrganization => self.disable_organization.handle(command).await,
                CommandType::DisableEnvironment => self.disable_environment.handle(command).await,
                CommandType::DeleteOrganization => self.delete_organization.handle(command).await,
                CommandType::DeleteEnvironment => self.delete_environment.handle(command).await,
                CommandType::Unsupported => {
                    warn!("unsupported command type");
                    Reply::error(&command, "Unsupported command type")
                }
            }
        }
        .instrument(span)
        .await
    }
}
