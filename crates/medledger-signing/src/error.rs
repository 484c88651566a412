//! Error types for the sign-request lifecycle

use thiserror::Error;

/// Sign-request lifecycle errors
#[derive(Debug, Error)]
pub enum SignError {
    /// The backend could not be reached or answered with a failure.
    /// Surfaced to the user as a retry prompt; never retried automatically.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A real-time message could not be parsed
    #[error("Malformed channel message: {0}")]
    MalformedMessage(String),

    /// The wait channel could not be opened
    #[error("Channel connect failed: {0}")]
    ChannelConnect(String),

    /// The wait channel closed before a terminal event
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// A response body did not match the expected envelope
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Input rejected before any network call
    #[error(transparent)]
    Invalid(#[from] medledger_core::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignError {
    /// Whether a manual user retry is the expected recovery
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SignError::BackendUnavailable(_) | SignError::ChannelConnect(_)
        )
    }
}

impl From<serde_json::Error> for SignError {
    fn from(err: serde_json::Error) -> Self {
        SignError::Serialization(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SignError>;
