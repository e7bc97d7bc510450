use std::sync::Arc;

use keel_core::KeelError;
use keel_core::models::membership::{Member, Membership};
use keel_core::models::reference::{Reference, ReferenceType};
use keel_core::models::role::RoleScope;
use keel_core::repository::{MembershipRepository, RoleRepository, Store, UserRepository};
use tracing::info;

use crate::command::{Command, CommandType, Reply};
use crate::config::SyncSettings;
use crate::error::{CommandError, CommandResult};
use crate::handler::{CommandHandler, reply_for};
use crate::payload::MembershipPayload;

/// Map a controller role name onto the local role name for `scope`.
///
/// `ENVIRONMENT_API_PUBLISHER` becomes `API_PUBLISHER`; the owner roles of
/// the controller fold onto the local `ADMIN`.
pub fn local_role_name(scope: RoleScope, remote: &str) -> String {
    let prefix = format!("{}_", scope.as_str());
    let name = remote.strip_prefix(prefix.as_str()).unwrap_or(remote);
    match name {
        "PRIMARY_OWNER" | "OWNER" => "ADMIN".to_string(),
        other => other.to_string(),
    }
}

fn role_scope(reference_type: ReferenceType) -> Option<RoleScope> {
    match reference_type {
        ReferenceType::Organization => Some(RoleScope::Organization),
        ReferenceType::Environment => Some(RoleScope::Environment),
        ReferenceType::Api => Some(RoleScope::Api),
        ReferenceType::Application => Some(RoleScope::Application),
        ReferenceType::Group => Some(RoleScope::Group),
        ReferenceType::Integration => Some(RoleScope::Integration),
        _ => None,
    }
}

/// Handles `MEMBERSHIP` commands: the member's roles on the reference are
/// replaced by the single mapped role.
pub struct MembershipSyncHandler<S: Store> {
    store: Arc<S>,
    settings: SyncSettings,
}

impl<S: Store> MembershipSyncHandler<S> {
    pub fn new(store: Arc<S>, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub async fn sync(&self, payload: MembershipPayload) -> CommandResult<Vec<Membership>> {
        let scope = role_scope(payload.reference_type).ok_or_else(|| {
            CommandError::rejected(format!(
                "Memberships on {} are not managed by the controller",
                payload.reference_type
            ))
        })?;

        let user = self
            .store
            .users()
            .find_by_source(
                &payload.organization_id,
                &self.settings.source,
                &payload.user_id,
            )
            .await?
            .ok_or_else(|| {
                CommandError::rejected(format!("User [{}] does not exist", payload.user_id))
            })?;

        let role_name = local_role_name(scope, &payload.role);
        let role = self
            .store
            .roles()
            .find_by_scope_and_name(scope, &role_name, &payload.organization_id)
            .await?
            .ok_or_else(|| KeelError::RoleNotFound {
                scope,
                name: role_name.clone(),
                organization_id: payload.organization_id.clone(),
            })?;

        let reference = Reference::new(payload.reference_type, &payload.reference_id);
        let memberships = self
            .store
            .memberships()
            .replace_roles(
                &reference,
                &Member::user(&user.id),
                std::slice::from_ref(&role),
                Some(self.settings.source.as_str()),
            )
            .await?;
        info!(
            user_id = %user.id,
            %reference,
            role = %role_name,
            "membership replaced"
        );
        Ok(memberships)
    }
}

impl<S: Store> CommandHandler for MembershipSyncHandler<S> {
    fn command_type(&self) -> CommandType {
        CommandType::Membership
    }

    async fn handle(&self, command: Command) -> Reply {
        let payload: MembershipPayload = match command.payload() {
            Ok(payload) => payload,
            Err(err) => return reply_for(&command, "", Err(err)),
        };
        let user_id = payload.user_id.clone();
        let outcome = self.sync(payload).await.map(|_| None);
        reply_for(&command, &user_id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_prefix_is_stripped() {
        assert_eq!(
            local_role_name(RoleScope::Environment, "ENVIRONMENT_API_PUBLISHER"),
            "API_PUBLISHER"
        );
        assert_eq!(local_role_name(RoleScope::Organization, "USER"), "USER");
    }

    #[test]
    fn owner_roles_fold_to_admin() {
        assert_eq!(
            local_role_name(RoleScope::Organization, "ORGANIZATION_PRIMARY_OWNER"),
            "ADMIN"
        );
        assert_eq!(local_role_name(RoleScope::Environment, "ENVIRONMENT_OWNER"), "ADMIN");
    }

    #[test]
    fn prefix_of_another_scope_is_kept() {
        assert_eq!(
            local_role_name(RoleScope::Environment, "ORGANIZATION_OWNER"),
            "ORGANIZATION_OWNER"
        );
    }
}
