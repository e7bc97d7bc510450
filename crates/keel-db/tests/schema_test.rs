//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    keel_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "organization",
        "environment",
        "user",
        "role",
        "membership",
        "token",
        "access_point",
        "search_entry",
        // generated owned collections
        "api",
        "rating_answer",
        "shared_policy_group_history",
        "identity_provider_activation",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    assert_eq!(keel_db::run_migrations(&db).await.unwrap(), 2);
    assert_eq!(keel_db::run_migrations(&db).await.unwrap(), 2);

    let mut result = db
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    assert_eq!(rows[0].total, 2);
}

#[tokio::test]
async fn user_source_identity_is_unique_per_organization() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    keel_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE user SET organization_id = 'org-1', source = 'cockpit', \
                  source_id = 'ext-1'";
    db.query(insert).await.unwrap().check().unwrap();
    let duplicate = db.query(insert).await.unwrap().check();
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn manager_opens_an_embedded_database_with_schema() {
    let config = keel_db::DbConfig {
        endpoint: "mem://".into(),
        ..Default::default()
    };
    let manager = keel_db::DbManager::connect(&config).await.unwrap();

    let mut result = manager
        .client()
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    assert_eq!(rows[0].total, 2);
}
