//! KEEL Command: the controller-facing command layer.
//!
//! This crate provides:
//! - The command / reply envelope ([`Command`], [`Reply`])
//! - Lifecycle sync handlers for organizations, environments, users and
//!   memberships ([`sync`])
//! - The `TARGET_TOKEN` provisioning saga and its executor
//!   ([`provisioning`], [`saga`])
//! - Cascading teardown of organizations and environments ([`cascade`])
//! - A [`Dispatcher`] routing each command to its handler
//!
//! Handlers are generic over [`keel_core::repository::Store`] and never
//! touch a storage engine directly.

pub mod access_point;
pub mod cascade;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod payload;
pub mod provisioning;
pub mod saga;
pub mod sync;
pub mod token;

pub use command::{Command, CommandType, Reply, ReplyStatus};
pub use config::{CommandSettings, SyncSettings, TokenSettings};
pub use dispatcher::Dispatcher;
pub use error::{CommandError, CommandResult};
pub use handler::CommandHandler;
