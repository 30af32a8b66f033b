//! Command outcome classification

use pagepilot_core::PilotError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state_machine::Rejection;

/// Kind carried on the wire in `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Precondition,
    ProviderExhausted,
    Failed,
}

/// Why a command did not produce its artifact
///
/// Every collaborator error is folded into one of these at the orchestrator
/// boundary. None of them is fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Invoked out of order or with a missing argument. Session untouched.
    #[error("{0}")]
    Precondition(String),

    /// The generation provider has no usable capacity left
    #[error("{0}")]
    ProviderExhausted(String),

    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::ProviderExhausted(_) => ErrorKind::ProviderExhausted,
            Self::Failed(_) => ErrorKind::Failed,
        }
    }
}

impl From<PilotError> for CommandError {
    fn from(err: PilotError) -> Self {
        match err {
            PilotError::Precondition(message) => Self::Precondition(message),
            PilotError::ProviderExhausted(detail) => Self::ProviderExhausted(format!(
                "The language model provider has no tokens available ({}). Check the API quota or try again later.",
                detail
            )),
            other => Self::Failed(other.to_string()),
        }
    }
}

impl From<Rejection> for CommandError {
    fn from(rejection: Rejection) -> Self {
        Self::Precondition(rejection.to_string())
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;
