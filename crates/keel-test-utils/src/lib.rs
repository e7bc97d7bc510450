//! Shared test utilities for keel tests.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a [`Store`](keel_core::repository::Store) kept in
//!   memory that journals every mutating call and can be told to fail
//! - Fixture helpers seeding organizations, environments, roles and owned
//!   records directly
//!
//! ```rust,ignore
//! let store = InMemoryStore::new();
//! let org = store.seed_organization("org-cockpit");
//! store.inject_failure(Fault::CreateToken);
//! ```

// Panicking on a poisoned lock is fine in test support code.
#![allow(clippy::expect_used)]

mod fixtures;
mod store;

pub use fixtures::STANDARD_ROLES;
pub use store::{Call, Fault, InMemoryStore};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("keel=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
