//! Gateway error types.

use thiserror::Error;

/// Result type for gateway operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures raised by the artifact store gateway.
///
/// Every variant is job-fatal for the caller. The gateway performs no
/// retries of its own; transport-level retry is left to the SDK.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store configuration incomplete: {0}")]
    Config(String),

    #[error("no such object: {0}")]
    NotFound(String),

    #[error("fetch of {object} failed: {reason}")]
    Fetch { object: String, reason: String },

    #[error("publish of {object} failed: {reason}")]
    Publish { object: String, reason: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store transport error: {0}")]
    Transport(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(object: impl Into<String>) -> Self {
        Self::NotFound(object.into())
    }

    pub fn fetch_failed(object: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            object: object.into(),
            reason: reason.into(),
        }
    }

    pub fn publish_failed(object: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Publish {
            object: object.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }
}
