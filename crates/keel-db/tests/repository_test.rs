//! Integration tests for the SurrealDB repositories using in-memory
//! SurrealDB.

use keel_core::ExecutionContext;
use keel_core::models::access_point::{AccessPointTarget, NewAccessPoint};
use keel_core::models::environment::{CreateEnvironment, UpdateEnvironment};
use keel_core::models::membership::{CreateMembership, Member};
use keel_core::models::organization::{CreateOrganization, UpdateOrganization};
use keel_core::models::record::{CreateOwnedRecord, STATE_STARTED, STATE_STOPPED};
use keel_core::models::reference::{Collection, Reference, ReferenceType};
use keel_core::models::role::{CreateRole, RoleScope};
use keel_core::models::token::CreateToken;
use keel_core::models::user::{CreateUser, UpdateUser};
use keel_core::repository::{
    AccessPointRepository, EnvironmentRepository, IndexedKind, MembershipRepository,
    OrganizationRepository, OwnedRecordRepository, RoleRepository, RuntimeService, SearchIndex,
    Store, TokenRepository, UserRepository,
};
use keel_core::KeelError;
use keel_db::SurrealStore;
use keel_db::repository::SurrealSearchIndex;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    keel_db::run_migrations(&db).await.unwrap();
    db
}

fn new_organization(id: &str) -> CreateOrganization {
    CreateOrganization {
        id: Some(id.into()),
        cockpit_id: Some(format!("cockpit-{id}")),
        hrids: vec![id.into()],
        name: id.into(),
        description: None,
    }
}

fn new_user(organization_id: &str, source_id: &str) -> CreateUser {
    CreateUser {
        id: None,
        organization_id: organization_id.into(),
        source: "cockpit".into(),
        source_id: source_id.into(),
        first_name: None,
        last_name: Some("Operator".into()),
        email: None,
        picture: None,
        custom_fields: None,
    }
}

// -----------------------------------------------------------------------
// Organizations & environments
// -----------------------------------------------------------------------

#[tokio::test]
async fn organization_round_trip() {
    let store = SurrealStore::new(setup().await);
    let repo = store.organizations();

    let org = repo.create(new_organization("org-1")).await.unwrap();
    assert_eq!(org.id, "org-1");

    let found = repo.find_by_cockpit_id("cockpit-org-1").await.unwrap().unwrap();
    assert_eq!(found.id, "org-1");
    assert!(repo.find_by_cockpit_id("nope").await.unwrap().is_none());

    let updated = repo
        .update(
            "org-1",
            UpdateOrganization {
                name: Some("Acme".into()),
                description: Some(Some("tenant".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Acme");
    assert_eq!(updated.description.as_deref(), Some("tenant"));
    assert_eq!(updated.hrids, vec!["org-1".to_string()]);

    let duplicate = repo.create(new_organization("org-1")).await;
    assert!(matches!(duplicate, Err(KeelError::AlreadyExists { .. })));

    repo.delete("org-1").await.unwrap();
    assert!(repo.get_by_id("org-1").await.unwrap_err().is_not_found());
    assert!(repo.delete("org-1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn environments_are_listed_per_organization() {
    let store = SurrealStore::new(setup().await);
    let repo = store.environments();

    for (org, id) in [("org-1", "env-a"), ("org-1", "env-b"), ("org-2", "env-c")] {
        repo.create(CreateEnvironment {
            id: Some(id.into()),
            organization_id: org.into(),
            cockpit_id: Some(format!("cockpit-{id}")),
            hrids: vec![],
            name: id.into(),
            description: None,
        })
        .await
        .unwrap();
    }

    let listed = repo.list_by_organization("org-1").await.unwrap();
    assert_eq!(listed.len(), 2);

    let renamed = repo
        .update(
            "env-a",
            UpdateEnvironment {
                hrids: Some(vec!["prod".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.hrids, vec!["prod".to_string()]);
    assert_eq!(renamed.organization_id, "org-1");

    let missing = repo.update("env-x", UpdateEnvironment::default()).await;
    assert!(missing.unwrap_err().is_not_found());
}

// -----------------------------------------------------------------------
// Identity & access
// -----------------------------------------------------------------------

#[tokio::test]
async fn users_are_unique_by_source_identity() {
    let store = SurrealStore::new(setup().await);
    let repo = store.users();

    let user = repo.create(new_user("org-1", "ext-1")).await.unwrap();
    assert_eq!(user.custom_fields, serde_json::json!({}));

    let found = repo
        .find_by_source("org-1", "cockpit", "ext-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert!(repo.find_by_source("org-2", "cockpit", "ext-1").await.unwrap().is_none());

    let duplicate = repo.create(new_user("org-1", "ext-1")).await;
    assert!(matches!(duplicate, Err(KeelError::AlreadyExists { .. })));

    let updated = repo
        .update(
            &user.id,
            UpdateUser {
                email: Some("ops@acme.test".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email.as_deref(), Some("ops@acme.test"));
    assert_eq!(updated.last_name.as_deref(), Some("Operator"));
}

#[tokio::test]
async fn memberships_are_replaced_per_reference() {
    let store = SurrealStore::new(setup().await);
    let roles = store.roles();
    let memberships = store.memberships();

    let mut created = Vec::new();
    for name in ["ADMIN", "USER"] {
        created.push(
            roles
                .create(CreateRole {
                    organization_id: "org-1".into(),
                    scope: RoleScope::Environment,
                    name: name.into(),
                    description: None,
                    default_role: false,
                    system: true,
                })
                .await
                .unwrap(),
        );
    }
    let admin = roles
        .find_by_scope_and_name(RoleScope::Environment, "ADMIN", "org-1")
        .await
        .unwrap()
        .unwrap();
    assert!(roles
        .find_by_scope_and_name(RoleScope::Organization, "ADMIN", "org-1")
        .await
        .unwrap()
        .is_none());

    let env = Reference::environment("env-1");
    let org = Reference::organization("org-1");
    let member = Member::user("user-1");
    memberships
        .create(CreateMembership::new(env.clone(), member.clone(), &admin).with_source("cockpit"))
        .await
        .unwrap();
    memberships
        .create(CreateMembership::new(org.clone(), member.clone(), &admin))
        .await
        .unwrap();

    let replaced = memberships
        .replace_roles(&env, &member, &created[1..], Some("cockpit"))
        .await
        .unwrap();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].role_name, "USER");

    let on_env = memberships.find_by_reference_and_member(&env, &member).await.unwrap();
    assert_eq!(on_env.len(), 1);
    assert_eq!(on_env[0].source.as_deref(), Some("cockpit"));
    assert_eq!(memberships.find_by_member(&member).await.unwrap().len(), 2);

    assert_eq!(memberships.delete_by_member(&member).await.unwrap(), 2);
    assert_eq!(memberships.delete_by_member(&member).await.unwrap(), 0);
}

#[tokio::test]
async fn tokens_belong_to_their_user() {
    let store = SurrealStore::new(setup().await);
    let tokens = store.tokens();

    let token = tokens
        .create(CreateToken {
            user_id: "user-1".into(),
            name: "operator".into(),
            token_hash: "ab".repeat(32),
        })
        .await
        .unwrap();

    assert_eq!(tokens.find_by_user("user-1").await.unwrap(), vec![token.clone()]);
    tokens.delete(&token.id).await.unwrap();
    assert!(tokens.find_by_user("user-1").await.unwrap().is_empty());
    assert!(tokens.delete(&token.id).await.unwrap_err().is_not_found());
}

// -----------------------------------------------------------------------
// Access points
// -----------------------------------------------------------------------

fn access_point(target: AccessPointTarget, host: &str) -> NewAccessPoint {
    NewAccessPoint {
        target,
        host: host.into(),
        secured: true,
        overriding: false,
    }
}

#[tokio::test]
async fn access_points_replace_keeps_order() {
    let store = SurrealStore::new(setup().await);
    let repo = store.access_points();
    let env = Reference::environment("env-1");

    repo.replace(
        &env,
        vec![
            access_point(AccessPointTarget::Portal, "a.portal.test"),
            access_point(AccessPointTarget::Gateway, "b.gw.test"),
        ],
    )
    .await
    .unwrap();

    let replaced = repo
        .replace(
            &env,
            vec![
                access_point(AccessPointTarget::Portal, "z.portal.test"),
                access_point(AccessPointTarget::Portal, "c.portal.test"),
            ],
        )
        .await
        .unwrap();
    let hosts: Vec<&str> = replaced.iter().map(|ap| ap.host.as_str()).collect();
    assert_eq!(hosts, ["z.portal.test", "c.portal.test"]);

    assert!(repo
        .find_by_reference_and_target(&env, AccessPointTarget::Gateway)
        .await
        .unwrap()
        .is_empty());
    let by_host = repo.find_by_host("c.portal.test").await.unwrap().unwrap();
    assert_eq!(by_host.reference, env);
    assert_eq!(by_host.url(), "https://c.portal.test");

    assert_eq!(repo.delete_by_reference(&env).await.unwrap().len(), 2);
    assert!(repo.find_by_reference(&env).await.unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Owned records, runtime and search
// -----------------------------------------------------------------------

#[tokio::test]
async fn owned_records_are_deleted_by_owner() {
    let store = SurrealStore::new(setup().await);
    let records = store.records();
    let env_1 = Reference::environment("env-1");
    let env_2 = Reference::environment("env-2");

    let mut inserted = Vec::new();
    for reference in [&env_1, &env_1, &env_2] {
        let record = records
            .insert(Collection::Plan, CreateOwnedRecord::new(reference.clone()))
            .await
            .unwrap();
        inserted.push(record.id);
    }

    let mut deleted = records.delete_by_reference(Collection::Plan, &env_1).await.unwrap();
    deleted.sort();
    let mut expected = inserted[..2].to_vec();
    expected.sort();
    assert_eq!(deleted, expected);
    assert!(records.find_by_reference(Collection::Plan, &env_1).await.unwrap().is_empty());
    assert!(records
        .delete_by_reference(Collection::Plan, &env_1)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(records.find_by_reference(Collection::Plan, &env_2).await.unwrap().len(), 1);

    let typed = records
        .insert(Collection::User, CreateOwnedRecord::new(env_1.clone()))
        .await;
    assert!(matches!(typed, Err(KeelError::Validation { .. })));
}

#[tokio::test]
async fn typed_tables_are_deleted_through_their_owner_columns() {
    let store = SurrealStore::new(setup().await);
    let user = store.users().create(new_user("org-1", "ext-1")).await.unwrap();
    store
        .tokens()
        .create(CreateToken {
            user_id: user.id.clone(),
            name: "t".into(),
            token_hash: "cd".repeat(32),
        })
        .await
        .unwrap();

    let org = Reference::organization("org-1");
    let user_ref = Reference::new(ReferenceType::User, user.id.clone());

    // Tokens are never owned by an organization directly.
    assert!(store
        .records()
        .delete_by_reference(Collection::Token, &org)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store.records().delete_by_reference(Collection::Token, &user_ref).await.unwrap().len(),
        1
    );
    assert_eq!(
        store.records().delete_by_reference(Collection::User, &org).await.unwrap(),
        vec![user.id]
    );
}

#[tokio::test]
async fn runtime_stops_started_apis_of_the_environment() {
    let store = SurrealStore::new(setup().await);
    let env = Reference::environment("env-1");
    let records = store.records();

    let started = records
        .insert(
            Collection::Api,
            CreateOwnedRecord::new(env.clone()).with_id("api-1").with_state(STATE_STARTED),
        )
        .await
        .unwrap();
    records
        .insert(
            Collection::Api,
            CreateOwnedRecord::new(env.clone()).with_id("api-2").with_state(STATE_STOPPED),
        )
        .await
        .unwrap();
    records
        .insert(Collection::Dictionary, CreateOwnedRecord::new(env.clone()).with_id("dict-1"))
        .await
        .unwrap();

    let ctx = ExecutionContext::environment("org-1", "env-1");
    let runtime = store.runtime();
    assert_eq!(runtime.started_apis(&ctx).await.unwrap(), vec![started.id.clone()]);
    assert_eq!(runtime.dictionaries(&ctx).await.unwrap(), vec!["dict-1".to_string()]);
    assert!(runtime
        .started_apis(&ExecutionContext::organization("org-1"))
        .await
        .unwrap()
        .is_empty());

    runtime.stop_api(&ctx, "api-1").await.unwrap();
    assert!(runtime.started_apis(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_removal_is_idempotent() {
    let db = setup().await;
    let search = SurrealSearchIndex::new(db);
    let ctx = ExecutionContext::environment("org-1", "env-1");

    search.index(&ctx, IndexedKind::Api, "api-1").await.unwrap();
    search.index(&ctx, IndexedKind::Api, "api-1").await.unwrap();
    search.index(&ctx, IndexedKind::Page, "api-1").await.unwrap();
    assert!(search.contains(IndexedKind::Api, "api-1").await.unwrap());

    search.remove(&ctx, IndexedKind::Api, "api-1").await.unwrap();
    search.remove(&ctx, IndexedKind::Api, "api-1").await.unwrap();
    assert!(!search.contains(IndexedKind::Api, "api-1").await.unwrap());
    assert!(search.contains(IndexedKind::Page, "api-1").await.unwrap());
}
