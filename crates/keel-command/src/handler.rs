//! The contract every command handler fulfils.

use tracing::{error, warn};

use crate::command::{Command, CommandType, Reply, ReplyStatus};
use crate::error::CommandResult;

/// Handles one [`CommandType`].
///
/// `handle` never fails: every error is turned into a FAILED or ERROR
/// [`Reply`]. Effects applied before a failure stay applied unless the
/// handler compensates them itself.
pub trait CommandHandler: Send + Sync {
    fn command_type(&self) -> CommandType;

    fn handle(&self, command: Command) -> impl Future<Output = Reply> + Send;
}

/// Turn a handler outcome into its reply, logging failures.
///
/// `aggregate_id` is whatever identifies the target in the logs (usually
/// the controller-side id carried by the payload).
pub fn reply_for(
    command: &Command,
    aggregate_id: &str,
    outcome: CommandResult<Option<serde_json::Value>>,
) -> Reply {
    match outcome {
        Ok(result) => {
            let reply = Reply::succeeded(command);
            match result {
                Some(value) => reply.with_result(value),
                None => reply,
            }
        }
        Err(err) => match err.status() {
            ReplyStatus::Failed => {
                warn!(
                    command_id = %command.id,
                    command_type = %command.command_type,
                    aggregate_id,
                    error = %err,
                    "command rejected"
                );
                Reply::failed(command, err.to_string())
            }
            _ => {
                error!(
                    command_id = %command.id,
                    command_type = %command.command_type,
                    aggregate_id,
                    error = %err,
                    "command processing failed"
                );
                Reply::error(command, err.to_string())
            }
        },
    }
}
