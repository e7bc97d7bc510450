//! Command / reply envelope exchanged with the controller.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Closed set of commands this control plane understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Organization,
    Environment,
    User,
    Membership,
    TargetToken,
    DisableOrganization,
    DisableEnvironment,
    DeleteOrganization,
    DeleteEnvironment,
    /// Any type tag this build does not know.
    #[serde(other)]
    Unsupported,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "ORGANIZATION",
            Self::Environment => "ENVIRONMENT",
            Self::User => "USER",
            Self::Membership => "MEMBERSHIP",
            Self::TargetToken => "TARGET_TOKEN",
            Self::DisableOrganization => "DISABLE_ORGANIZATION",
            Self::DisableEnvironment => "DISABLE_ENVIRONMENT",
            Self::DeleteOrganization => "DELETE_ORGANIZATION",
            Self::DeleteEnvironment => "DELETE_ENVIRONMENT",
            Self::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound command. The payload stays opaque until a handler claims it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Command {
    pub fn new(
        id: impl Into<String>,
        command_type: CommandType,
        payload: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: id.into(),
            command_type,
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Decode the payload into the handler's typed view of it.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        T::deserialize(&self.payload).map_err(|e| CommandError::InvalidPayload {
            command_type: self.command_type,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyStatus {
    Succeeded,
    /// A business rule rejected the command; nothing was changed.
    Failed,
    /// Unexpected technical failure; partial effects may remain.
    Error,
}

/// The single answer produced for a [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub command_id: String,
    pub command_type: CommandType,
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl Reply {
    pub fn succeeded(command: &Command) -> Self {
        Self {
            command_id: command.id.clone(),
            command_type: command.command_type,
            status: ReplyStatus::Succeeded,
            message: None,
            result: None,
        }
    }

    pub fn failed(command: &Command, message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Failed,
            message: Some(message.into()),
            ..Self::succeeded(command)
        }
    }

    pub fn error(command: &Command, message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: Some(message.into()),
            ..Self::succeeded(command)
        }
    }

    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_command_type_deserializes_as_unsupported() {
        let command: Command =
            serde_json::from_value(json!({ "id": "c-1", "type": "INSTALLATION", "payload": {} }))
                .unwrap();
        assert_eq!(command.command_type, CommandType::Unsupported);
    }

    #[test]
    fn reply_omits_empty_fields_on_the_wire() {
        let command = Command::new("c-1", CommandType::DeleteEnvironment, json!({})).unwrap();
        let wire = serde_json::to_value(Reply::succeeded(&command)).unwrap();
        assert_eq!(
            wire,
            json!({
                "command_id": "c-1",
                "command_type": "DELETE_ENVIRONMENT",
                "status": "SUCCEEDED"
            })
        );
    }

    #[test]
    fn invalid_payload_is_reported_with_command_type() {
        let command = Command::new("c-1", CommandType::User, json!({ "id": 7 })).unwrap();
        let err = command.payload::<crate::payload::UserPayload>().unwrap_err();
        assert!(matches!(
            err,
            CommandError::InvalidPayload {
                command_type: CommandType::User,
                ..
            }
        ));
    }
}
