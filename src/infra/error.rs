//! Error types for the compliance pipeline infrastructure

use thiserror::Error;

/// Errors that can occur in the compliance infrastructure
#[derive(Error, Debug)]
pub enum ComplianceError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error while reading an uploaded file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An external collaborator reported a failure
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// An external collaborator did not answer in time
    #[error("{collaborator} timed out after {after_ms}ms")]
    Timeout {
        collaborator: &'static str,
        after_ms: u64,
    },

    /// Payload (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(String),

    /// Internal error (malformed stored rows, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ComplianceError {
    /// Build a collaborator failure
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        ComplianceError::Collaborator {
            collaborator,
            message: message.into(),
        }
    }
}

/// Result type for compliance operations
pub type Result<T> = std::result::Result<T, ComplianceError>;
