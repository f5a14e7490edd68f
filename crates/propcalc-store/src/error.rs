//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not establish a connection to the backing store.
    #[error("store connection failed: {0}")]
    Connect(String),

    /// A command against the store failed.
    #[error("store command failed: {0}")]
    Command(String),

    /// The store is not configured (missing URL or credentials).
    #[error("store not configured: {0}")]
    NotConfigured(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() {
            StoreError::Connect(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}
