use std::error::Error;
use thiserror::Error;

/// Result alias for state tree operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by state tree backends regardless of the underlying storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
