//! Command-layer error type and its mapping onto reply statuses.

use keel_core::error::KeelError;
use thiserror::Error;

use crate::command::{CommandType, ReplyStatus};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid {command_type} payload: {reason}")]
    InvalidPayload {
        command_type: CommandType,
        reason: String,
    },

    /// Business-rule rejection; the command changed nothing.
    #[error("{0}")]
    Rejected(String),

    /// A multi-step operation stopped and unwound its effects.
    #[error("{message}")]
    Aborted { message: String },

    #[error(transparent)]
    Store(#[from] KeelError),
}

impl CommandError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Reply status this error is reported with.
    pub fn status(&self) -> ReplyStatus {
        match self {
            Self::Rejected(_) => ReplyStatus::Failed,
            Self::InvalidPayload { .. } | Self::Aborted { .. } | Self::Store(_) => {
                ReplyStatus::Error
            }
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::models::role::RoleScope;

    #[test]
    fn rejections_fail_and_everything_else_errors() {
        assert_eq!(
            CommandError::rejected("still has environments").status(),
            ReplyStatus::Failed
        );
        assert_eq!(
            CommandError::from(KeelError::RoleNotFound {
                scope: RoleScope::Environment,
                name: "OWNER".into(),
                organization_id: "org".into(),
            })
            .status(),
            ReplyStatus::Error
        );
        assert_eq!(
            CommandError::from(KeelError::Database("down".into())).status(),
            ReplyStatus::Error
        );
    }
}
