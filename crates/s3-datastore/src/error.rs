use thiserror::Error;

use crate::client::StorageError;

/// Result type for data store operations
pub type DataStoreResult<T> = Result<T, DataStoreError>;

/// Error types for the data store
#[derive(Error, Debug)]
pub enum DataStoreError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
