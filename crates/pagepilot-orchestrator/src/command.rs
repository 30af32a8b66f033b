//! Inbound command model
//!
//! Frames arrive as `{"command": "<name>", "payload": {...}}`. Payload fields
//! are read leniently; required ones are validated by the operation itself so
//! a missing value surfaces as a precondition error for that phase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CommandError, CommandResult};

/// Raw inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Explore { url: String },
    Design,
    RefineDesign { feedback: String },
    Generate { max_rounds: Option<usize> },
    RefineCode { issue: String },
    Verify,
    Reset,
    Chat { message: String },
    Unknown(String),
}

impl Command {
    /// Parse a text frame
    pub fn from_json(text: &str) -> CommandResult<Self> {
        let message: CommandMessage = serde_json::from_str(text)
            .map_err(|e| CommandError::Failed(format!("Invalid command message: {}", e)))?;
        Ok(message.into())
    }

    /// Wire name of the command
    pub fn name(&self) -> &str {
        match self {
            Self::Explore { .. } => "explore",
            Self::Design => "design",
            Self::RefineDesign { .. } => "refine",
            Self::Generate { .. } => "generate",
            Self::RefineCode { .. } => "refine_code",
            Self::Verify => "verify",
            Self::Reset => "reset",
            Self::Chat { .. } => "chat",
            Self::Unknown(name) => name,
        }
    }
}

impl From<CommandMessage> for Command {
    fn from(message: CommandMessage) -> Self {
        let payload = &message.payload;
        match message.command.as_str() {
            "explore" => Self::Explore {
                url: text_field(payload, "url"),
            },
            "design" => Self::Design,
            "refine" => Self::RefineDesign {
                feedback: text_field(payload, "feedback"),
            },
            "generate" => Self::Generate {
                max_rounds: payload
                    .get("max_rounds")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize),
            },
            "refine_code" => Self::RefineCode {
                issue: text_field(payload, "issue"),
            },
            "verify" => Self::Verify,
            "reset" => Self::Reset,
            "chat" => Self::Chat {
                message: text_field(payload, "message"),
            },
            _ => Self::Unknown(message.command),
        }
    }
}

fn text_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}
