//! Domain models for KEEL.
//!
//! These are the core types shared across all crates.

pub mod access_point;
pub mod environment;
pub mod membership;
pub mod organization;
pub mod record;
pub mod reference;
pub mod role;
pub mod token;
pub mod user;
