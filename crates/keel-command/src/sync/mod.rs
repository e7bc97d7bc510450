//! Lifecycle sync handlers.
//!
//! Each handler upserts one aggregate by the controller's correlation id:
//! an existing record is updated in place (local id and children kept), an
//! unseen one is created.

mod environment;
mod membership;
mod organization;
mod user;

pub use environment::EnvironmentSyncHandler;
pub use membership::{MembershipSyncHandler, local_role_name};
pub use organization::OrganizationSyncHandler;
pub use user::UserSyncHandler;
