//! Error types for core registry operations

use thiserror::Error;

/// Result type alias for core registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core registry operations
#[derive(Debug, Error)]
pub enum Error {
    // ============ Input Errors ============
    /// A required field is missing or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid input value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ============ Ledger Errors ============
    /// Ledger RPC call failed
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Invalid ledger address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ============ Vault Errors ============
    /// Encryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption failed (wrong passcode or corrupted blob)
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Record not found in the store
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    // ============ Session Errors ============
    /// Session token could not be read or written
    #[error("Session error: {0}")]
    Session(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ============ Internal Errors ============
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check whether the error is recoverable by user re-entry
    /// (e.g. a wrong vault passcode) rather than a system fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Decryption(_) | Error::MissingField(_) | Error::InvalidInput(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Deserialization(e.to_string())
    }
}
