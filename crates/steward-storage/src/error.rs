//! Storage error taxonomy.

use thiserror::Error;

use steward_client::ClientError;
use steward_types::StateError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from the state-manager backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The HTTP protocol layer failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The database layer failed.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The state model rejected the data.
    #[error(transparent)]
    State(#[from] StateError),

    /// A value did not encode to or decode from JSON.
    #[error("serializing state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Persisted data could not be interpreted.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// A conditional write was attempted before any read captured a version
    /// token to condition it on.
    #[error("no state has been read; a write must follow a read")]
    NotYetRead,
}

impl StorageError {
    /// True when a fresh read followed by a retry of the same operation may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::Client(err) => err.is_retryable(),
            _ => false,
        }
    }
}
