//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default API origin (can be overridden at compile time via BLOOM_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("BLOOM_API_URL") {
    Some(url) => url,
    None => "https://api.bloomapp.dev",
};

/// Fixed API version path prefix appended to the origin.
pub const API_VERSION_PREFIX: &str = "/api/v1";

/// Fixed request timeout applied to every outbound request.
pub const REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// API origin (scheme + host, no version prefix).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    REQUEST_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_ms: REQUEST_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    /// Note: api_url is compile-time only and always uses the built-in
    /// default, regardless of what's in the config file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        // Force compile-time value (never from config file)
        config.api_url = DEFAULT_API_URL.to_string();

        // Environment variables can only override log_level
        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    /// Only log_level can be overridden at runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("BLOOM_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Get the versioned API base (origin + version prefix) as a parsed URL.
    pub fn api_base(&self) -> CoreResult<Url> {
        let base = format!("{}{}", self.api_url.trim_end_matches('/'), API_VERSION_PREFIX);
        Url::parse(&base).map_err(CoreError::from)
    }
}
