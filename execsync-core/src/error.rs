//! Error types for Executive Sync.

use thiserror::Error;

/// Errors that can occur in Executive Sync operations.
#[derive(Error, Debug)]
pub enum ExecSyncError {
    #[error("Sign-in failed: {0}")]
    Auth(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Could not decode document '{id}': {reason}")]
    Decode { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ExecSyncError {
    pub(crate) fn decode(id: &str, reason: impl Into<String>) -> Self {
        ExecSyncError::Decode {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Executive Sync operations.
pub type ExecSyncResult<T> = Result<T, ExecSyncError>;
