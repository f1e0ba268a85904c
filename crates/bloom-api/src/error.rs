//! API error taxonomy.

use serde_json::Value;
use thiserror::Error;

/// Fallback message when a failure response carries none.
pub(crate) const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Fallback message for transport-level failures with no server payload.
pub(crate) const GENERIC_NETWORK_MESSAGE: &str = "Network request failed";

/// API error type.
///
/// Every failure surfaced by the verb facade is one of these variants;
/// nothing is swallowed silently.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport succeeded but the embedded business code denotes failure.
    /// Never triggers session renewal.
    #[error("{message} (code {code})")]
    Business {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// Transport-level authorization failure (401-class).
    #[error("Authorization required: {message}")]
    Unauthorized { status: u16, message: String },

    /// Other non-success transport status (5xx, 404, ...).
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    /// Network-level failure (timeout, DNS, connection refused, ...).
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Normalized numeric code: the business code, the HTTP status, or 500
    /// when neither applies.
    pub fn code(&self) -> i64 {
        match self {
            ApiError::Business { code, .. } => *code,
            ApiError::Unauthorized { status, .. } => i64::from(*status),
            ApiError::Status { status, .. } => i64::from(*status),
            ApiError::Http(e) => e.status().map(|s| i64::from(s.as_u16())).unwrap_or(500),
            ApiError::Json(_) | ApiError::InvalidUrl(_) => 500,
        }
    }

    /// Human-readable message suitable for UI display.
    pub fn message(&self) -> String {
        match self {
            ApiError::Business { message, .. } => message.clone(),
            ApiError::Unauthorized { message, .. } => message.clone(),
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Http(_) => GENERIC_NETWORK_MESSAGE.to_string(),
            ApiError::Json(e) => e.to_string(),
            ApiError::InvalidUrl(e) => e.to_string(),
        }
    }

    /// Server payload attached to the failure, if any.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Business { data, .. } | ApiError::Status { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// True for 401-class transport failures.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
