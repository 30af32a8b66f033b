//! Unified error types for pagepilot

use thiserror::Error;

/// Unified error type for all pagepilot operations
#[derive(Error, Debug)]
pub enum PilotError {
    // Session errors
    #[error("{0}")]
    Precondition(String),

    // Provider errors
    #[error("Provider exhausted: {0}")]
    ProviderExhausted(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // Collaborator errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Test runner error: {0}")]
    Runner(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl PilotError {
    /// True when the generation provider has no usable capacity left
    pub fn is_provider_exhausted(&self) -> bool {
        matches!(self, PilotError::ProviderExhausted(_))
    }
}

/// Result type alias using PilotError
pub type Result<T> = std::result::Result<T, PilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(PilotError::ProviderExhausted("quota".into()).is_provider_exhausted());
        assert!(!PilotError::Provider("boom".into()).is_provider_exhausted());
    }

    #[test]
    fn test_precondition_message_is_bare() {
        let err = PilotError::Precondition("Must explore page first".into());
        assert_eq!(err.to_string(), "Must explore page first");
    }
}
