//! Command-line flags. Every flag can also be set through its `KEEL_*`
//! environment variable.

use clap::Parser;
use keel_command::{CommandSettings, SyncSettings, TokenSettings};
use keel_db::{DbConfig, DbCredentials};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "keel-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SurrealDB endpoint: `ws://host:port`, `wss://...` or `mem://`.
    #[arg(long, env = "KEEL_DB_ENDPOINT", default_value = "ws://127.0.0.1:8000")]
    pub db_endpoint: String,

    #[arg(long, env = "KEEL_DB_NAMESPACE", default_value = "keel")]
    pub db_namespace: String,

    #[arg(long, env = "KEEL_DB_DATABASE", default_value = "main")]
    pub db_database: String,

    /// Root user; sign-in is skipped when unset.
    #[arg(long, env = "KEEL_DB_USERNAME", requires = "db_password")]
    pub db_username: Option<String>,

    #[arg(long, env = "KEEL_DB_PASSWORD", requires = "db_username", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "KEEL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Commands handled at the same time.
    #[arg(long, env = "KEEL_MAX_CONCURRENCY", default_value_t = 16,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_concurrency: u32,

    /// Name given to provisioned tokens when the command carries none.
    #[arg(long, env = "KEEL_TOKEN_DEFAULT_NAME", default_value = "Cloud Token")]
    pub token_default_name: String,

    /// Identity source stamped on users created for token provisioning.
    #[arg(long, env = "KEEL_TOKEN_SOURCE", default_value = "cloud-token")]
    pub token_source: String,

    /// Identity source of users mirrored from the controller.
    #[arg(long, env = "KEEL_SYNC_SOURCE", default_value = "cockpit")]
    pub sync_source: String,
}

impl Cli {
    pub fn db_config(&self) -> DbConfig {
        let credentials = match (&self.db_username, &self.db_password) {
            (Some(username), Some(password)) => Some(DbCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        DbConfig {
            endpoint: self.db_endpoint.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            credentials,
        }
    }

    pub fn command_settings(&self) -> CommandSettings {
        CommandSettings {
            token: TokenSettings {
                default_name: self.token_default_name.clone(),
                source: self.token_source.clone(),
            },
            sync: SyncSettings {
                source: self.sync_source.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["keel-server"]).unwrap();

        let db = cli.db_config();
        let expected = DbConfig::default();
        assert_eq!(db.endpoint, expected.endpoint);
        assert_eq!(db.namespace, expected.namespace);
        assert_eq!(db.database, expected.database);
        assert!(db.credentials.is_none());

        let settings = cli.command_settings();
        let expected = CommandSettings::default();
        assert_eq!(settings.token.default_name, expected.token.default_name);
        assert_eq!(settings.token.source, expected.token.source);
        assert_eq!(settings.sync.source, expected.sync.source);
    }

    #[test]
    fn credentials_come_in_pairs() {
        assert!(Cli::try_parse_from(["keel-server", "--db-username", "root"]).is_err());

        let cli = Cli::try_parse_from([
            "keel-server",
            "--db-username",
            "root",
            "--db-password",
            "secret",
        ])
        .unwrap();
        let credentials = cli.db_config().credentials.unwrap();
        assert_eq!(credentials.username, "root");
        assert_eq!(credentials.password, "secret");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["keel-server", "--max-concurrency", "0"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "keel-server",
            "--log-format",
            "pretty",
            "--sync-source",
            "controller",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert_eq!(cli.command_settings().sync.source, "controller");
    }
}
