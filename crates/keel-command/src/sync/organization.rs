use std::sync::Arc;

use keel_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use keel_core::models::reference::Reference;
use keel_core::repository::{OrganizationRepository, Store};
use serde_json::json;
use tracing::info;

use crate::access_point;
use crate::command::{Command, CommandType, Reply};
use crate::error::CommandResult;
use crate::handler::{CommandHandler, reply_for};
use crate::payload::OrganizationPayload;

/// Handles `ORGANIZATION` commands.
pub struct OrganizationSyncHandler<S: Store> {
    store: Arc<S>,
}

impl<S: Store> OrganizationSyncHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn sync(&self, payload: OrganizationPayload) -> CommandResult<Organization> {
        let organizations = self.store.organizations();
        let organization = match organizations.find_by_cockpit_id(&payload.cockpit_id).await? {
            Some(existing) => {
                let updated = organizations
                    .update(
                        &existing.id,
                        UpdateOrganization {
                            hrids: Some(payload.hrids),
                            name: Some(payload.name),
                            description: Some(payload.description),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(cockpit_id = %payload.cockpit_id, organization_id = %updated.id, "organization updated");
                updated
            }
            None => {
                let created = organizations
                    .create(CreateOrganization {
                        id: payload.id,
                        cockpit_id: Some(payload.cockpit_id.clone()),
                        hrids: payload.hrids,
                        name: payload.name,
                        description: payload.description,
                    })
                    .await?;
                info!(cockpit_id = %payload.cockpit_id, organization_id = %created.id, "organization created");
                created
            }
        };

        if let Some(access_points) = payload.access_points {
            access_point::replace(
                self.store.access_points(),
                &Reference::organization(&organization.id),
                access_points,
            )
            .await?;
        }
        Ok(organization)
    }
}

impl<S: Store> CommandHandler for OrganizationSyncHandler<S> {
    fn command_type(&self) -> CommandType {
        CommandType::Organization
    }

    async fn handle(&self, command: Command) -> Reply {
        let payload: OrganizationPayload = match command.payload() {
            Ok(payload) => payload,
            Err(err) => return reply_for(&command, "", Err(err)),
        };
        let cockpit_id = payload.cockpit_id.clone();
        let outcome = self
            .sync(payload)
            .await
            .map(|organization| Some(json!({ "id": organization.id })));
        reply_for(&command, &cockpit_id, outcome)
    }
}
