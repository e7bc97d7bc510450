//! SurrealDB connection bootstrap.
//!
//! The endpoint scheme picks the engine: `ws://` / `wss://` for a remote
//! server, `mem://` for an embedded in-memory database (requires the
//! `kv-mem` feature of `surrealdb`).

use std::fmt;

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;
use crate::schema::run_migrations;

/// Root credentials. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Sign in as root when set. Embedded engines need none.
    pub credentials: Option<DbCredentials>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000".into(),
            namespace: "keel".into(),
            database: "main".into(),
            credentials: None,
        }
    }
}

impl DbConfig {
    pub fn is_embedded(&self) -> bool {
        self.endpoint.starts_with("mem://")
    }
}

/// An open, migrated database handle.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Open the endpoint, sign in when credentials are configured, select
    /// the namespace and database, then bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database,
            embedded = config.is_embedded(),
            "Opening SurrealDB"
        );

        let db = any::connect(config.endpoint.as_str()).await?;

        if let Some(credentials) = &config.credentials {
            debug!(username = %credentials.username, "Signing in as root");
            db.signin(Root {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        run_migrations(&db).await?;

        info!("SurrealDB ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_redacted() {
        let credentials = DbCredentials {
            username: "root".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("root"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn embedded_endpoints_are_detected() {
        let mut config = DbConfig::default();
        assert!(!config.is_embedded());
        config.endpoint = "mem://".into();
        assert!(config.is_embedded());
    }
}
