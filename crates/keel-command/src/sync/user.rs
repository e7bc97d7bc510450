use std::sync::Arc;

use keel_core::models::user::{CreateUser, UpdateUser, User};
use keel_core::repository::{OrganizationRepository, Store, UserRepository};
use serde_json::json;
use tracing::info;

use crate::command::{Command, CommandType, Reply};
use crate::config::SyncSettings;
use crate::error::{CommandError, CommandResult};
use crate::handler::{CommandHandler, reply_for};
use crate::payload::UserPayload;

/// Handles `USER` commands. Users are matched on
/// `(organization, source, controller id)`.
pub struct UserSyncHandler<S: Store> {
    store: Arc<S>,
    settings: SyncSettings,
}

impl<S: Store> UserSyncHandler<S> {
    pub fn new(store: Arc<S>, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub async fn sync(&self, payload: UserPayload) -> CommandResult<User> {
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

        let source = payload
            .source
            .unwrap_or_else(|| self.settings.source.clone());
        let users = self.store.users();
        let existing = users
            .find_by_source(&payload.organization_id, &source, &payload.id)
            .await?;

        let user = match existing {
            Some(existing) => {
                let updated = users
                    .update(
                        &existing.id,
                        UpdateUser {
                            first_name: payload.first_name,
                            last_name: payload.last_name,
                            email: payload.email,
                            picture: payload.picture,
                            custom_fields: payload.custom_fields,
                        },
                    )
                    .await?;
                info!(source_id = %payload.id, user_id = %updated.id, "user updated");
                updated
            }
            None => {
                let created = users
                    .create(CreateUser {
                        id: None,
                        organization_id: payload.organization_id,
                        source,
                        source_id: payload.id.clone(),
                        first_name: payload.first_name,
                        last_name: payload.last_name,
                        email: payload.email,
                        picture: payload.picture,
                        custom_fields: payload.custom_fields,
                    })
                    .await?;
                info!(source_id = %payload.id, user_id = %created.id, "user created");
                created
            }
        };
        Ok(user)
    }
}

impl<S: Store> CommandHandler for UserSyncHandler<S> {
    fn command_type(&self) -> CommandType {
        CommandType::User
    }

    async fn handle(&self, command: Command) -> Reply {
        let payload: UserPayload = match command.payload() {
            Ok(payload) => payload,
            Err(err) => return reply_for(&command, "", Err(err)),
        };
        let source_id = payload.id.clone();
        let outcome = self
            .sync(payload)
            .await
            .map(|user| Some(json!({ "id": user.id })));
        reply_for(&command, &source_id, outcome)
    }
}
