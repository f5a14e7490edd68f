//! Error types for account and session operations.

use thiserror::Error;

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur in the account service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input; no store access was attempted.
    #[error("{0}")]
    Validation(String),

    /// The operation conflicts with existing state (duplicate email,
    /// admin already claimed).
    #[error("{0}")]
    Conflict(String),

    /// Wrong password, missing/expired/invalid token, or insufficient
    /// role.
    #[error("{0}")]
    Unauthorized(String),

    /// The referenced account does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The backing store failed or is misconfigured. Fails the whole
    /// request closed.
    #[error("store error: {0}")]
    Store(#[from] propcalc_store::StoreError),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Decode(String),
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Store(_) => 500,
            Self::Decode(_) => 500,
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Decode(err.to_string())
    }
}
