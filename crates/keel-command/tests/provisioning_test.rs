//! Integration tests for the TARGET_TOKEN provisioning saga.

use std::sync::Arc;

use keel_command::provisioning::TargetTokenHandler;
use keel_command::token::hash_token;
use keel_command::{Command, CommandHandler, CommandType, ReplyStatus, TokenSettings};
use keel_core::models::role::RoleScope;
use keel_test_utils::{Call, Fault, InMemoryStore};
use serde_json::json;

/// Helper: organization `org-1` with the standard roles, and a handler.
fn setup() -> (Arc<InMemoryStore>, TargetTokenHandler<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    store.seed_organization("org-1");
    store.seed_environment("org-1", "env-1", "cockpit-env-1");
    let handler = TargetTokenHandler::new(store.clone(), TokenSettings::default());
    (store, handler)
}

fn command(scope: &str) -> Command {
    Command::new(
        "cmd-1",
        CommandType::TargetToken,
        json!({
            "id": "ext-user",
            "organization_id": "org-1",
            "environment_id": "env-1",
            "scope": scope,
        }),
    )
    .unwrap()
}

fn position(calls: &[Call], pred: impl Fn(&Call) -> bool) -> usize {
    calls.iter().position(pred).expect("call not journaled")
}

#[tokio::test]
async fn full_success_creates_user_memberships_and_token() {
    let (store, handler) = setup();

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Succeeded, "{reply:?}");
    let result = reply.result.expect("result");
    let token = result["token"].as_str().unwrap();
    assert_eq!(token.len(), 43);

    let users = store.all_users();
    assert_eq!(users.len(), 1);
    assert_eq!(result["user_id"], users[0].id.as_str());
    assert_eq!(users[0].source, "cloud-token");
    assert_eq!(users[0].source_id, "ext-user");

    let memberships = store.all_memberships();
    assert_eq!(memberships.len(), 2);
    assert!(
        memberships
            .iter()
            .any(|m| m.role_scope == RoleScope::Organization && m.role_name == "ADMIN")
    );
    assert!(
        memberships
            .iter()
            .any(|m| m.role_scope == RoleScope::Environment && m.role_name == "API_PUBLISHER")
    );

    let tokens = store.all_tokens();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token_hash, hash_token(token));
    assert_eq!(tokens[0].name, "Cloud Token");
}

#[tokio::test]
async fn gateway_scope_grants_plain_user_roles() {
    let (store, handler) = setup();

    let reply = handler.handle(command("GATEWAY")).await;

    assert!(reply.is_success());
    let mut roles: Vec<_> = store
        .all_memberships()
        .into_iter()
        .map(|m| (m.role_scope, m.role_name))
        .collect();
    roles.sort_by_key(|(scope, _)| scope.as_str());
    assert_eq!(
        roles,
        vec![
            (RoleScope::Environment, "USER".to_string()),
            (RoleScope::Organization, "USER".to_string()),
        ]
    );
}

#[tokio::test]
async fn organization_role_failure_deletes_only_the_user() {
    let (store, handler) = setup();
    store.remove_role(RoleScope::Organization, "ADMIN");

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Failed);
    assert!(reply.message.unwrap().contains("ORGANIZATION_ADMIN"));
    assert_eq!(store.count_calls(|c| matches!(c, Call::DeleteUser(_))), 1);
    assert_eq!(
        store.count_calls(|c| matches!(
            c,
            Call::FindRole {
                scope: RoleScope::Environment,
                ..
            }
        )),
        0
    );
    assert_eq!(store.count_calls(|c| matches!(c, Call::CreateToken(_))), 0);
    assert!(store.all_users().is_empty());
}

#[tokio::test]
async fn environment_role_failure_removes_memberships_before_user() {
    let (store, handler) = setup();
    store.remove_role(RoleScope::Environment, "API_PUBLISHER");

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Failed);
    let calls = store.calls();
    let memberships_removed = position(&calls, |c| matches!(c, Call::DeleteMembershipsOf(_)));
    let user_deleted = position(&calls, |c| matches!(c, Call::DeleteUser(_)));
    assert!(memberships_removed < user_deleted);
    assert_eq!(store.count_calls(|c| matches!(c, Call::CreateToken(_))), 0);
    assert!(store.all_users().is_empty());
    assert!(store.all_memberships().is_empty());
}

#[tokio::test]
async fn technical_failure_unwinds_everything_and_errors() {
    let (store, handler) = setup();
    store.inject_failure(Fault::CreateToken);

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Error);
    assert!(reply.message.is_some());
    assert!(store.all_users().is_empty());
    assert!(store.all_memberships().is_empty());
    assert!(store.all_tokens().is_empty());
    // Both membership compensations are guarded: only one bulk removal.
    assert_eq!(
        store.count_calls(|c| matches!(c, Call::DeleteMembershipsOf(_))),
        1
    );
}

#[tokio::test]
async fn technical_failure_on_first_step_compensates_nothing() {
    let (store, handler) = setup();
    store.inject_failure(Fault::CreateUser);

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Error);
    assert_eq!(store.count_calls(|c| matches!(c, Call::FindRole { .. })), 0);
    assert_eq!(store.count_calls(|c| matches!(c, Call::DeleteUser(_))), 0);
}

#[tokio::test]
async fn failing_compensation_is_escalated_and_others_still_run() {
    let (store, handler) = setup();
    store.remove_role(RoleScope::Environment, "API_PUBLISHER");
    store.inject_failure(Fault::DeleteUser);

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Error);
    let message = reply.message.unwrap();
    assert!(message.contains("compensation failed"), "{message}");
    assert!(message.contains("create-user"), "{message}");
    assert!(store.all_memberships().is_empty());
    assert_eq!(store.all_users().len(), 1);
}

#[tokio::test]
async fn unknown_organization_is_rejected_without_side_effects() {
    let store = Arc::new(InMemoryStore::new());
    let handler = TargetTokenHandler::new(store.clone(), TokenSettings::default());

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Failed);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn already_provisioned_user_is_rejected() {
    let (store, handler) = setup();
    assert!(handler.handle(command("GKO")).await.is_success());

    let reply = handler.handle(command("GKO")).await;

    assert_eq!(reply.status, ReplyStatus::Failed);
    assert_eq!(store.all_users().len(), 1);
    assert_eq!(store.all_tokens().len(), 1);
}
