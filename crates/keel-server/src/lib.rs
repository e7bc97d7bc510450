//! KEEL Server: reads controller commands as newline-delimited JSON,
//! dispatches them against the SurrealDB store and writes one reply line
//! per command.

pub mod cli;
pub mod logging;
pub mod serve;

pub use cli::Cli;
pub use serve::{ServeSummary, serve};
