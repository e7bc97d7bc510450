//! KEEL Core: domain models, error types and the collaborator contracts
//! consumed by the command layer.
//!
//! Nothing in this crate performs I/O. Storage engines implement the
//! traits in [`repository`]; the command handlers only ever see those
//! traits, bundled behind [`repository::Store`].

pub mod context;
pub mod error;
pub mod models;
pub mod repository;

pub use context::ExecutionContext;
pub use error::{KeelError, KeelResult};

/// Mint a new local identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
