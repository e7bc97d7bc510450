//! `TARGET_TOKEN` provisioning saga.
//!
//! Creates a technical user in the target organization, grants it an
//! organization role and an environment role picked by the token scope,
//! then issues a token bound to it. The raw token value is returned in the
//! reply and never stored.

use std::fmt;
use std::sync::Arc;

use keel_core::ExecutionContext;
use keel_core::KeelError;
use keel_core::models::membership::{CreateMembership, Member};
use keel_core::models::reference::Reference;
use keel_core::models::role::{Role, RoleScope};
use keel_core::models::token::CreateToken;
use keel_core::models::user::CreateUser;
use keel_core::repository::{
    MembershipRepository, OrganizationRepository, RoleRepository, Store, TokenRepository,
    UserRepository,
};
use serde_json::json;
use tracing::{debug, info};

use crate::command::{Command, CommandType, Reply};
use crate::config::TokenSettings;
use crate::error::{CommandError, CommandResult};
use crate::handler::{CommandHandler, reply_for};
use crate::payload::{TargetTokenPayload, TokenScope};
use crate::saga::{Saga, SagaExecutor};
use crate::token::{generate_token_value, hash_token};

/// Organization role granted for a token scope.
pub fn organization_role(scope: TokenScope) -> &'static str {
    match scope {
        TokenScope::Gko => "ADMIN",
        TokenScope::Gateway => "USER",
    }
}

/// Environment role granted for a token scope.
pub fn environment_role(scope: TokenScope) -> &'static str {
    match scope {
        TokenScope::Gko => "API_PUBLISHER",
        TokenScope::Gateway => "USER",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStep {
    CreateUser,
    AssignOrganizationRole,
    AssignEnvironmentRole,
    IssueToken,
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateUser => "create-user",
            Self::AssignOrganizationRole => "assign-organization-role",
            Self::AssignEnvironmentRole => "assign-environment-role",
            Self::IssueToken => "issue-token",
        })
    }
}

/// What the saga has created so far.
#[derive(Debug, Default)]
pub struct ProvisioningState {
    pub user_id: Option<String>,
    pub token_id: Option<String>,
    pub token: Option<String>,
}

/// One run of the provisioning saga.
pub struct ProvisioningSaga<'a, S: Store> {
    store: &'a S,
    settings: &'a TokenSettings,
    payload: &'a TargetTokenPayload,
    ctx: ExecutionContext,
}

impl<'a, S: Store> ProvisioningSaga<'a, S> {
    pub fn new(store: &'a S, settings: &'a TokenSettings, payload: &'a TargetTokenPayload) -> Self {
        Self {
            store,
            settings,
            payload,
            ctx: ExecutionContext::environment(
                &payload.organization_id,
                &payload.environment_id,
            ),
        }
    }

    async fn resolve_role(&self, scope: RoleScope, name: &str) -> CommandResult<Role> {
        self.store
            .roles()
            .find_by_scope_and_name(scope, name, &self.ctx.organization_id)
            .await?
            .ok_or_else(|| {
                CommandError::rejected(format!(
                    "Role {scope}_{name} does not exist in organization [{}]",
                    self.ctx.organization_id
                ))
            })
    }

    async fn assign(
        &self,
        state: &ProvisioningState,
        reference: Reference,
        scope: RoleScope,
        name: &str,
    ) -> CommandResult<()> {
        let role = self.resolve_role(scope, name).await?;
        let user_id = created_user(state)?;
        self.store
            .memberships()
            .create(
                CreateMembership::new(reference, Member::user(user_id), &role)
                    .with_source(&self.settings.source),
            )
            .await?;
        Ok(())
    }

    /// Guarded removal of every membership the user holds.
    async fn remove_memberships(&self, state: &ProvisioningState) -> CommandResult<()> {
        let Some(user_id) = state.user_id.as_deref() else {
            return Ok(());
        };
        let member = Member::user(user_id);
        let memberships = self.store.memberships();
        if memberships.find_by_member(&member).await?.is_empty() {
            return Ok(());
        }
        let removed = memberships.delete_by_member(&member).await?;
        debug!(user_id, removed, "memberships removed");
        Ok(())
    }
}

fn created_user(state: &ProvisioningState) -> CommandResult<&str> {
    state
        .user_id
        .as_deref()
        .ok_or_else(|| KeelError::Internal("provisioned user missing from saga state".into()).into())
}

impl<S: Store> Saga for ProvisioningSaga<'_, S> {
    type Step = ProvisioningStep;
    type State = ProvisioningState;

    fn name(&self) -> &'static str {
        "provisioning"
    }

    fn steps(&self) -> Vec<ProvisioningStep> {
        vec![
            ProvisioningStep::CreateUser,
            ProvisioningStep::AssignOrganizationRole,
            ProvisioningStep::AssignEnvironmentRole,
            ProvisioningStep::IssueToken,
        ]
    }

    async fn execute(
        &self,
        step: ProvisioningStep,
        state: &mut ProvisioningState,
    ) -> CommandResult<()> {
        match step {
            ProvisioningStep::CreateUser => {
                if let Err(err) = self
                    .store
                    .organizations()
                    .get_by_id(&self.ctx.organization_id)
                    .await
                {
                    return Err(if err.is_not_found() {
                        CommandError::rejected(format!(
                            "Organization [{}] does not exist",
                            self.ctx.organization_id
                        ))
                    } else {
                        err.into()
                    });
                }
                let user = self
                    .store
                    .users()
                    .create(CreateUser {
                        id: None,
                        organization_id: self.ctx.organization_id.clone(),
                        source: self.settings.source.clone(),
                        source_id: self.payload.id.clone(),
                        first_name: None,
                        last_name: Some(self.token_name().to_string()),
                        email: None,
                        picture: None,
                        custom_fields: None,
                    })
                    .await
                    .map_err(|err| match err {
                        KeelError::AlreadyExists { .. } => CommandError::rejected(format!(
                            "User [{}] is already provisioned",
                            self.payload.id
                        )),
                        other => other.into(),
                    })?;
                state.user_id = Some(user.id);
                Ok(())
            }
            ProvisioningStep::AssignOrganizationRole => {
                self.assign(
                    state,
                    Reference::organization(&self.ctx.organization_id),
                    RoleScope::Organization,
                    organization_role(self.payload.scope),
                )
                .await
            }
            ProvisioningStep::AssignEnvironmentRole => {
                self.assign(
                    state,
                    Reference::environment(&self.payload.environment_id),
                    RoleScope::Environment,
                    environment_role(self.payload.scope),
                )
                .await
            }
            ProvisioningStep::IssueToken => {
                let user_id = created_user(state)?.to_string();
                let raw = generate_token_value();
                let token = self
                    .store
                    .tokens()
                    .create(CreateToken {
                        user_id,
                        name: self.token_name().to_string(),
                        token_hash: hash_token(&raw),
                    })
                    .await?;
                state.token_id = Some(token.id);
                state.token = Some(raw);
                Ok(())
            }
        }
    }

    async fn compensate(
        &self,
        step: ProvisioningStep,
        state: &mut ProvisioningState,
    ) -> CommandResult<()> {
        match step {
            ProvisioningStep::CreateUser => {
                if let Some(user_id) = state.user_id.take() {
                    match self.store.users().delete(&user_id).await {
                        Err(err) if !err.is_not_found() => {
                            state.user_id = Some(user_id);
                            return Err(err.into());
                        }
                        _ => debug!(%user_id, "provisioned user deleted"),
                    }
                }
                Ok(())
            }
            ProvisioningStep::AssignOrganizationRole | ProvisioningStep::AssignEnvironmentRole => {
                self.remove_memberships(state).await
            }
            ProvisioningStep::IssueToken => {
                if let Some(token_id) = state.token_id.take() {
                    state.token = None;
                    match self.store.tokens().delete(&token_id).await {
                        Err(err) if !err.is_not_found() => return Err(err.into()),
                        _ => debug!(%token_id, "issued token revoked"),
                    }
                }
                Ok(())
            }
        }
    }
}

impl<S: Store> ProvisioningSaga<'_, S> {
    fn token_name(&self) -> &str {
        self.payload
            .name
            .as_deref()
            .unwrap_or(&self.settings.default_name)
    }
}

/// Handles `TARGET_TOKEN` commands.
pub struct TargetTokenHandler<S: Store> {
    store: Arc<S>,
    settings: TokenSettings,
}

impl<S: Store> TargetTokenHandler<S> {
    pub fn new(store: Arc<S>, settings: TokenSettings) -> Self {
        Self { store, settings }
    }

    /// Run the saga; on success returns `(user id, raw token)`.
    pub async fn provision(&self, payload: &TargetTokenPayload) -> CommandResult<(String, String)> {
        let saga = ProvisioningSaga::new(self.store.as_ref(), &self.settings, payload);
        let mut state = ProvisioningState::default();
        SagaExecutor::new(&saga).run(&mut state).await?;

        match (state.user_id, state.token) {
            (Some(user_id), Some(token)) => {
                info!(
                    organization_id = %payload.organization_id,
                    environment_id = %payload.environment_id,
                    %user_id,
                    "token provisioned"
                );
                Ok((user_id, token))
            }
            _ => Err(KeelError::Internal("saga completed without a token".into()).into()),
        }
    }
}

impl<S: Store> CommandHandler for TargetTokenHandler<S> {
    fn command_type(&self) -> CommandType {
        CommandType::TargetToken
    }

    async fn handle(&self, command: Command) -> Reply {
        let payload: TargetTokenPayload = match command.payload() {
            Ok(payload) => payload,
            Err(err) => return reply_for(&command, "", Err(err)),
        };
        let outcome = self
            .provision(&payload)
            .await
            .map(|(user_id, token)| Some(json!({ "user_id": user_id, "token": token })));
        reply_for(&command, &payload.id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_selects_fixed_role_pair() {
        assert_eq!(organization_role(TokenScope::Gko), "ADMIN");
        assert_eq!(environment_role(TokenScope::Gko), "API_PUBLISHER");
        assert_eq!(organization_role(TokenScope::Gateway), "USER");
        assert_eq!(environment_role(TokenScope::Gateway), "USER");
    }
}
