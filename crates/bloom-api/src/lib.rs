//! Authenticated HTTP access layer for the Bloom client.
//!
//! This crate is the single chokepoint between screens/stores and the
//! backend:
//! - Bearer credential attachment on every outgoing request
//! - Uniform decoding of the business envelope `{code?, message?, data}`
//! - Transparent, single-flight session renewal on HTTP 401, with at most
//!   one retry per logical request
//! - Normalization of every failure into a structured [`ApiError`]

mod client;
mod envelope;
mod error;
mod request;

pub use client::{ApiClient, RENEWAL_PATH};
pub use envelope::{decode_envelope, Envelope};
pub use error::{ApiError, ApiResult};
pub use request::{RequestBody, RequestDescriptor, UploadForm};
