//! Canonical decoding of the business response envelope.
//!
//! Every transport-successful response body is decoded through
//! [`decode_envelope`]; there is no per-call-site shape sniffing.

use crate::error::{ApiError, ApiResult, GENERIC_FAILURE_MESSAGE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Business envelope shape: `{ code?, message?, data }`.
///
/// `code` is an application-level status distinct from the HTTP status.
/// Some endpoints omit it entirely by design; an absent code means success.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: Option<i64>,
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Accepted success sentinels: absent, `0`, or `200`.
fn is_success_code(code: i64) -> bool {
    code == 0 || code == 200
}

impl Envelope {
    /// True when the embedded business code denotes success.
    pub fn is_success(&self) -> bool {
        self.code.map_or(true, is_success_code)
    }

    /// Consume the envelope, yielding the typed `data` on business success
    /// or a [`ApiError::Business`] rejection otherwise.
    pub fn into_data<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self.code {
            Some(code) if !is_success_code(code) => Err(ApiError::Business {
                code,
                message: self
                    .message
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
                data: if self.data.is_null() {
                    None
                } else {
                    Some(self.data)
                },
            }),
            _ => Ok(serde_json::from_value(self.data)?),
        }
    }
}

/// Decode a transport-successful response body into typed data.
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    let envelope: Envelope = serde_json::from_str(body)?;
    envelope.into_data()
}
