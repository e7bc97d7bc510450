//! KEEL Database: SurrealDB connection management, schema migrations and
//! the storage implementation of every `keel-core` repository trait.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Repository implementations, bundled as [`SurrealStore`]

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbCredentials, DbManager};
pub use error::DbError;
pub use repository::SurrealStore;
pub use schema::{run_migrations, schema_v1, schema_v2};
