//! Integration tests for cascading teardown.

use std::sync::Arc;

use keel_command::cascade::{CascadeGraph, CascadeOrchestrator, Teardown, TeardownHandler};
use keel_command::{Command, CommandHandler, CommandType, ReplyStatus};
use keel_core::models::access_point::AccessPointTarget;
use keel_core::models::record::STATE_STOPPED;
use keel_core::models::reference::{Collection, Reference, ReferenceType};
use keel_core::repository::IndexedKind;
use keel_test_utils::{Call, Fault, InMemoryStore};
use serde_json::json;

fn handler(store: &Arc<InMemoryStore>, teardown: Teardown) -> TeardownHandler<InMemoryStore> {
    let orchestrator =
        Arc::new(CascadeOrchestrator::new(store.clone(), &CascadeGraph::standard()).unwrap());
    TeardownHandler::new(store.clone(), orchestrator, teardown)
}

fn command(command_type: CommandType, id: &str) -> Command {
    Command::new("cmd-1", command_type, json!({ "id": id })).unwrap()
}

/// Environment `abc` (controller id `env-42`) owning apis `api-1`,
/// `api-2` and group `grp-9`, each with a few dependents.
fn seed_env_42(store: &InMemoryStore) {
    store.seed_organization("org-1");
    store.seed_environment("org-1", "abc", "env-42");
    let env = Reference::environment("abc");

    for api in ["api-1", "api-2"] {
        store.seed_started_api("abc", api);
        let owner = Reference::new(ReferenceType::Api, api);
        store.seed_record(Collection::Flow, owner.clone(), &format!("flow-{api}"));
        store.seed_record(Collection::ApiQualityRule, owner.clone(), &format!("qr-{api}"));
        store.seed_record(Collection::Audit, owner.clone(), &format!("audit-{api}"));
        store.seed_record(Collection::Metadata, owner.clone(), &format!("meta-{api}"));
        store.seed_membership(owner.clone(), "u-1", "OWNER");
        let rating = store.seed_record(Collection::Rating, owner, &format!("rating-{api}"));
        store.seed_record(
            Collection::RatingAnswer,
            Reference::new(ReferenceType::Rating, &rating.id),
            &format!("answer-{api}"),
        );
    }

    store.seed_record(Collection::Group, env.clone(), "grp-9");
    let group = Reference::new(ReferenceType::Group, "grp-9");
    store.seed_membership(group.clone(), "u-1", "MEMBER");
    store.seed_record(Collection::Invitation, group, "inv-1");

    store.seed_record(Collection::Dictionary, env.clone(), "dict-1");
    store.seed_record(Collection::IdentityProviderActivation, env.clone(), "idp-act-1");
    store.seed_access_point(env.clone(), AccessPointTarget::Portal, "portal.acme.io");
    store.seed_record(Collection::Subscription, env.clone(), "sub-1");
    store.seed_record(Collection::Audit, env, "audit-env");
}

#[tokio::test]
async fn delete_environment_walks_every_owned_collection() {
    let store = Arc::new(InMemoryStore::new());
    seed_env_42(&store);
    let handler = handler(&store, Teardown::DeleteEnvironment);

    let reply = handler
        .handle(command(CommandType::DeleteEnvironment, "env-42"))
        .await;

    assert_eq!(reply.status, ReplyStatus::Succeeded, "{reply:?}");
    let calls = store.calls();

    // Workloads are stopped before anything is deleted.
    let stopped = calls
        .iter()
        .position(|c| matches!(c, Call::StopApi(id) if id == "api-2"))
        .unwrap();
    let apis_deleted = calls
        .iter()
        .position(|c| {
            matches!(c, Call::DeleteRecords { collection: Collection::Api, reference }
                if reference == &Reference::environment("abc"))
        })
        .unwrap();
    assert!(stopped < apis_deleted);

    for api in ["api-1", "api-2"] {
        let owner = Reference::new(ReferenceType::Api, api);
        for collection in [
            Collection::Flow,
            Collection::ApiQualityRule,
            Collection::Audit,
            Collection::Membership,
            Collection::Metadata,
        ] {
            assert!(
                calls.contains(&Call::DeleteRecords {
                    collection,
                    reference: owner.clone()
                }),
                "{collection} of {api} not deleted"
            );
        }
        assert!(calls.contains(&Call::Unindex(IndexedKind::Api, api.to_string())));
        assert!(!store.is_indexed(IndexedKind::Api, api));
    }

    let group = Reference::new(ReferenceType::Group, "grp-9");
    assert!(calls.contains(&Call::DeleteRecords {
        collection: Collection::Membership,
        reference: group.clone()
    }));
    assert!(calls.contains(&Call::DeleteRecords {
        collection: Collection::Invitation,
        reference: group
    }));

    assert_eq!(calls.last(), Some(&Call::DeleteEnvironment("abc".into())));

    assert!(store.all_environments().is_empty());
    assert!(store.all_memberships().is_empty());
    assert!(store.all_access_points().is_empty());
    for collection in [
        Collection::Api,
        Collection::Flow,
        Collection::ApiQualityRule,
        Collection::Audit,
        Collection::Metadata,
        Collection::Rating,
        Collection::RatingAnswer,
        Collection::Group,
        Collection::Invitation,
        Collection::Dictionary,
        Collection::IdentityProviderActivation,
        Collection::Subscription,
    ] {
        assert!(store.all_records(collection).is_empty(), "{collection} left");
    }
    assert_eq!(store.all_organizations().len(), 1);
}

#[tokio::test]
async fn deleting_an_environment_twice_succeeds_both_times() {
    let store = Arc::new(InMemoryStore::new());
    seed_env_42(&store);
    let handler = handler(&store, Teardown::DeleteEnvironment);

    let first = handler
        .handle(command(CommandType::DeleteEnvironment, "env-42"))
        .await;
    store.clear_calls();
    let second = handler
        .handle(command(CommandType::DeleteEnvironment, "env-42"))
        .await;

    assert_eq!(first.status, ReplyStatus::Succeeded);
    assert_eq!(second.status, ReplyStatus::Succeeded);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn failed_delete_keeps_progress_and_rerun_completes() {
    let store = Arc::new(InMemoryStore::new());
    seed_env_42(&store);
    let handler = handler(&store, Teardown::DeleteEnvironment);
    store.inject_failure(Fault::DeleteRecords(Collection::Group));

    let failed = handler
        .handle(command(CommandType::DeleteEnvironment, "env-42"))
        .await;

    assert_eq!(failed.status, ReplyStatus::Error);
    assert!(
        failed
            .message
            .unwrap()
            .contains("Error occurred when deleting environment with id [env-42]")
    );
    assert!(store.all_records(Collection::Api).is_empty());
    assert_eq!(store.all_records(Collection::Group).len(), 1);
    assert_eq!(store.all_environments().len(), 1);

    store.clear_failures();
    let retried = handler
        .handle(command(CommandType::DeleteEnvironment, "env-42"))
        .await;

    assert_eq!(retried.status, ReplyStatus::Succeeded);
    assert!(store.all_records(Collection::Group).is_empty());
    assert!(store.all_environments().is_empty());
}

#[tokio::test]
async fn organization_with_environments_cannot_be_deleted() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_organization("org-1");
    store.seed_environment("org-1", "env-a", "cockpit-env-a");
    store.seed_environment("org-1", "env-b", "cockpit-env-b");
    let handler = handler(&store, Teardown::DeleteOrganization);

    let reply = handler
        .handle(command(CommandType::DeleteOrganization, "cockpit-org-1"))
        .await;

    assert_eq!(reply.status, ReplyStatus::Failed);
    assert!(reply.message.unwrap().contains('2'));
    assert!(store.calls().is_empty());
    assert_eq!(store.all_organizations().len(), 1);
}

#[tokio::test]
async fn empty_organization_is_deleted_with_its_users() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_organization("org-1");
    store.seed_user("org-1", "u-1");
    store.seed_token("u-1", "tok-1");
    store.seed_record(
        Collection::Metadata,
        Reference::new(ReferenceType::User, "u-1"),
        "meta-u-1",
    );
    store.seed_membership(Reference::organization("org-1"), "u-1", "ADMIN");
    store.seed_access_point(
        Reference::organization("org-1"),
        AccessPointTarget::Console,
        "console.acme.io",
    );
    store.seed_record(Collection::Tag, Reference::organization("org-1"), "tag-1");
    let handler = handler(&store, Teardown::DeleteOrganization);

    let reply = handler
        .handle(command(CommandType::DeleteOrganization, "cockpit-org-1"))
        .await;

    assert_eq!(reply.status, ReplyStatus::Succeeded, "{reply:?}");
    assert!(store.all_organizations().is_empty());
    assert!(store.all_users().is_empty());
    assert!(store.all_tokens().is_empty());
    assert!(store.all_memberships().is_empty());
    assert!(store.all_access_points().is_empty());
    assert!(store.all_records(Collection::Metadata).is_empty());
    assert!(store.all_records(Collection::Tag).is_empty());
    assert_eq!(
        store.calls().last(),
        Some(&Call::DeleteOrganization("org-1".into()))
    );
}

#[tokio::test]
async fn unknown_aggregates_are_already_deleted() {
    let store = Arc::new(InMemoryStore::new());

    for (teardown, command_type) in [
        (Teardown::DeleteOrganization, CommandType::DeleteOrganization),
        (Teardown::DeleteEnvironment, CommandType::DeleteEnvironment),
        (Teardown::DisableOrganization, CommandType::DisableOrganization),
        (Teardown::DisableEnvironment, CommandType::DisableEnvironment),
    ] {
        let reply = handler(&store, teardown)
            .handle(command(command_type, "nowhere"))
            .await;
        assert_eq!(reply.status, ReplyStatus::Succeeded);
    }
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn disable_environment_stops_workloads_without_deleting_them() {
    let store = Arc::new(InMemoryStore::new());
    seed_env_42(&store);
    let handler = handler(&store, Teardown::DisableEnvironment);

    let reply = handler
        .handle(command(CommandType::DisableEnvironment, "env-42"))
        .await;

    assert_eq!(reply.status, ReplyStatus::Succeeded);
    let apis = store.all_records(Collection::Api);
    assert_eq!(apis.len(), 2);
    assert!(apis.iter().all(|a| a.state.as_deref() == Some(STATE_STOPPED)));
    assert_eq!(
        store.all_records(Collection::Dictionary)[0].state.as_deref(),
        Some(STATE_STOPPED)
    );
    assert!(store.all_access_points().is_empty());
    assert!(
        store
            .all_records(Collection::IdentityProviderActivation)
            .is_empty()
    );
    assert_eq!(store.all_environments().len(), 1);
    assert_eq!(store.all_records(Collection::Group).len(), 1);
}

#[tokio::test]
async fn disable_organization_disables_each_environment() {
    let store = Arc::new(InMemoryStore::new());
    seed_env_42(&store);
    store.seed_access_point(
        Reference::organization("org-1"),
        AccessPointTarget::Console,
        "console.acme.io",
    );
    let handler = handler(&store, Teardown::DisableOrganization);

    let reply = handler
        .handle(command(CommandType::DisableOrganization, "cockpit-org-1"))
        .await;

    assert_eq!(reply.status, ReplyStatus::Succeeded);
    assert_eq!(store.count_calls(|c| matches!(c, Call::StopApi(_))), 2);
    assert!(store.all_access_points().is_empty());
    assert_eq!(store.all_organizations().len(), 1);
}

#[tokio::test]
async fn disabling_twice_is_harmless() {
    let store = Arc::new(InMemoryStore::new());
    seed_env_42(&store);
    let handler = handler(&store, Teardown::DisableEnvironment);

    handler
        .handle(command(CommandType::DisableEnvironment, "env-42"))
        .await;
    store.clear_calls();
    let reply = handler
        .handle(command(CommandType::DisableEnvironment, "env-42"))
        .await;

    assert_eq!(reply.status, ReplyStatus::Succeeded);
    assert_eq!(store.count_calls(|c| matches!(c, Call::StopApi(_))), 0);
}
