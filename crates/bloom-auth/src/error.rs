//! Session lifecycle error taxonomy.

use thiserror::Error;

/// Errors surfaced by the session store.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The underlying API call failed.
    #[error(transparent)]
    Api(#[from] bloom_api::ApiError),

    /// A user record could not be encoded or merged.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested operation is not valid in the current session state.
    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    /// The operation requires an authenticated user.
    #[error("No authenticated user")]
    NotAuthenticated,
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
