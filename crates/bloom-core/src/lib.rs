//! Core types, configuration, and utilities for the Bloom client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, API_VERSION_PREFIX, DEFAULT_API_URL, REQUEST_TIMEOUT_MS};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
