use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness constraint rejected the write (duplicate game code, duplicate
    /// round batch, or a second submission for the same (round, player) pair).
    #[error("duplicate record: {message}")]
    Duplicate { message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a duplicate-record error for a violated uniqueness constraint.
    pub fn duplicate(message: impl Into<String>) -> Self {
        StorageError::Duplicate {
            message: message.into(),
        }
    }
}
