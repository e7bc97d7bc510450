use std::sync::Arc;

use keel_core::models::environment::{CreateEnvironment, Environment, UpdateEnvironment};
use keel_core::models::reference::Reference;
use keel_core::repository::{EnvironmentRepository, OrganizationRepository, Store};
use serde_json::json;
use tracing::info;

use crate::access_point;
use crate::command::{Command, CommandType, Reply};
use crate::error::{CommandError, CommandResult};
use crate::handler::{CommandHandler, reply_for};
use crate::payload::EnvironmentPayload;

/// Handles `ENVIRONMENT` commands. The owning organization must already
/// be known locally.
pub struct EnvironmentSyncHandler<S: Store> {
    store: Arc<S>,
}

impl<S: Store> EnvironmentSyncHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn sync(&self, payload: EnvironmentPayload) -> CommandResult<Environment> {
        if let Err(err) = self
            .store
            .organizations()
            .get_by_id(&payload.organization_id)
            .await
        {
            return Err(if err.is_not_found() {
                CommandError::rejected(format!(
                    "Organization [{}] does not exist",
                    payload.organization_id
                ))
            } else {
                err.into()
            });
        }

        let environments = self.store.environments();
        let environment = match environments.find_by_cockpit_id(&payload.cockpit_id).await? {
            Some(existing) => {
                let updated = environments
                    .update(
                        &existing.id,
                        UpdateEnvironment {
                            hrids: Some(payload.hrids),
                            name: Some(payload.name),
                            description: Some(payload.description),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(cockpit_id = %payload.cockpit_id, environment_id = %updated.id, "environment updated");
                updated
            }
            None => {
                let created = environments
                    .create(CreateEnvironment {
                        id: payload.id,
                        organization_id: payload.organization_id,
                        cockpit_id: Some(payload.cockpit_id.clone()),
                        hrids: payload.hrids,
                        name: payload.name,
                        description: payload.description,
                    })
                    .await?;
                info!(cockpit_id = %payload.cockpit_id, environment_id = %created.id, "environment created");
                created
            }
        };

        if let Some(access_points) = payload.access_points {
            access_point::replace(
                self.store.access_points(),
                &Reference::environment(&environment.id),
                access_points,
            )
            .await?;
        }
        Ok(environment)
    }
}

impl<S: Store> CommandHandler for EnvironmentSyncHandler<S> {
    fn command_type(&self) -> CommandType {
        CommandType::Environment
    }

    async fn handle(&self, command: Command) -> Reply {
        let payload: EnvironmentPayload = match command.payload() {
            Ok(payload) => payload,
            Err(err) => return reply_for(&command, "", Err(err)),
        };
        let cockpit_id = payload.cockpit_id.clone();
        let outcome = self
            .sync(payload)
            .await
            .map(|environment| Some(json!({ "id": environment.id })));
        reply_for(&command, &cockpit_id, outcome)
    }
}
