//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. Ids are strings. Enums are stored as their
//! wire names. Every table holding owned records carries an index on its
//! owner columns so bulk deletes by owner stay cheap.

use keel_core::models::reference::Collection;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: fn() -> String,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "tenant_topology",
        sql: schema_v1,
    },
    Migration {
        version: 2,
        name: "owned_collections",
        sql: schema_v2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: organizations, environments, identity, access points
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (aggregate roots)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD cockpit_id ON TABLE organization TYPE option<string>;
DEFINE FIELD hrids ON TABLE organization TYPE array<string> DEFAULT [];
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD description ON TABLE organization TYPE option<string>;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_cockpit ON TABLE organization \
    COLUMNS cockpit_id;

-- =======================================================================
-- Environments (owned by an organization)
-- =======================================================================
DEFINE TABLE environment SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE environment TYPE string;
DEFINE FIELD cockpit_id ON TABLE environment TYPE option<string>;
DEFINE FIELD hrids ON TABLE environment TYPE array<string> DEFAULT [];
DEFINE FIELD name ON TABLE environment TYPE string;
DEFINE FIELD description ON TABLE environment TYPE option<string>;
DEFINE FIELD created_at ON TABLE environment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE environment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_environment_cockpit ON TABLE environment \
    COLUMNS cockpit_id;
DEFINE INDEX idx_environment_org ON TABLE environment \
    COLUMNS organization_id;

-- =======================================================================
-- Users (unique per organization by identity source)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE user TYPE string;
DEFINE FIELD source ON TABLE user TYPE string;
DEFINE FIELD source_id ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE option<string>;
DEFINE FIELD last_name ON TABLE user TYPE option<string>;
DEFINE FIELD email ON TABLE user TYPE option<string>;
DEFINE FIELD picture ON TABLE user TYPE option<string>;
DEFINE FIELD custom_fields ON TABLE user TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_source ON TABLE user \
    COLUMNS organization_id, source, source_id UNIQUE;

-- =======================================================================
-- Roles (per organization and scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE role TYPE string;
DEFINE FIELD scope ON TABLE role TYPE string \
    ASSERT $value IN ['ORGANIZATION', 'ENVIRONMENT', 'API', 'APPLICATION', \
    'GROUP', 'INTEGRATION'];
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE option<string>;
DEFINE FIELD default_role ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD system ON TABLE role TYPE bool DEFAULT false;
DEFINE INDEX idx_role_scope_name ON TABLE role \
    COLUMNS organization_id, scope, name UNIQUE;

-- =======================================================================
-- Memberships (member holds a role on a reference)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD reference_type ON TABLE membership TYPE string;
DEFINE FIELD reference_id ON TABLE membership TYPE string;
DEFINE FIELD member_type ON TABLE membership TYPE string \
    ASSERT $value IN ['USER', 'GROUP'];
DEFINE FIELD member_id ON TABLE membership TYPE string;
DEFINE FIELD role_id ON TABLE membership TYPE string;
DEFINE FIELD role_scope ON TABLE membership TYPE string;
DEFINE FIELD role_name ON TABLE membership TYPE string;
DEFINE FIELD source ON TABLE membership TYPE option<string>;
DEFINE FIELD created_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_reference ON TABLE membership \
    COLUMNS reference_type, reference_id;
DEFINE INDEX idx_membership_member ON TABLE membership \
    COLUMNS member_type, member_id;

-- =======================================================================
-- Tokens (hash only)
-- =======================================================================
DEFINE TABLE token SCHEMAFULL;
DEFINE FIELD user_id ON TABLE token TYPE string;
DEFINE FIELD name ON TABLE token TYPE string;
DEFINE FIELD token_hash ON TABLE token TYPE string;
DEFINE FIELD created_at ON TABLE token TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_token_user ON TABLE token COLUMNS user_id;
DEFINE INDEX idx_token_hash ON TABLE token COLUMNS token_hash UNIQUE;

-- =======================================================================
-- Access points
-- =======================================================================
DEFINE TABLE access_point SCHEMAFULL;
DEFINE FIELD reference_type ON TABLE access_point TYPE string \
    ASSERT $value IN ['ORGANIZATION', 'ENVIRONMENT'];
DEFINE FIELD reference_id ON TABLE access_point TYPE string;
DEFINE FIELD target ON TABLE access_point TYPE string;
DEFINE FIELD host ON TABLE access_point TYPE string;
DEFINE FIELD secured ON TABLE access_point TYPE bool DEFAULT false;
DEFINE FIELD overriding ON TABLE access_point TYPE bool DEFAULT false;
DEFINE FIELD position ON TABLE access_point TYPE int DEFAULT 0;
DEFINE INDEX idx_access_point_reference ON TABLE access_point \
    COLUMNS reference_type, reference_id;
DEFINE INDEX idx_access_point_host ON TABLE access_point COLUMNS host;

-- =======================================================================
-- Search index documents
-- =======================================================================
DEFINE TABLE search_entry SCHEMAFULL;
DEFINE FIELD kind ON TABLE search_entry TYPE string \
    ASSERT $value IN ['API', 'PAGE'];
DEFINE FIELD document_id ON TABLE search_entry TYPE string;
DEFINE FIELD environment_id ON TABLE search_entry TYPE option<string>;
DEFINE INDEX idx_search_entry_document ON TABLE search_entry \
    COLUMNS kind, document_id UNIQUE;
";

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> String {
    SCHEMA_V1.to_string()
}

// -----------------------------------------------------------------------
// Schema v2: generic owned collections
// -----------------------------------------------------------------------

/// One SCHEMAFULL table per generic collection, all with the same shape.
pub fn schema_v2() -> String {
    let mut ddl = String::new();
    for collection in Collection::GENERIC {
        let t = collection.table();
        ddl.push_str(&format!(
            "DEFINE TABLE {t} SCHEMAFULL;\n\
             DEFINE FIELD reference_type ON TABLE {t} TYPE string;\n\
             DEFINE FIELD reference_id ON TABLE {t} TYPE string;\n\
             DEFINE FIELD name ON TABLE {t} TYPE option<string>;\n\
             DEFINE FIELD state ON TABLE {t} TYPE option<string>;\n\
             DEFINE FIELD created_at ON TABLE {t} TYPE datetime DEFAULT time::now();\n\
             DEFINE INDEX idx_{t}_reference ON TABLE {t} COLUMNS reference_type, reference_id;\n"
        ));
    }
    ddl
}

/// Bring the schema up to date and return the resulting version.
///
/// Only migrations newer than the last recorded one are applied, so
/// running this on every start is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let recorded = records.first().map(|m| m.version).unwrap_or(0);
    let mut version = recorded;

    for migration in MIGRATIONS.iter().filter(|m| m.version > recorded) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query((migration.sql)()).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
        version = migration.version;
    }

    debug!(version, "Schema up to date");
    Ok(version)
}
