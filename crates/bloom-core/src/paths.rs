//! File system paths for the client.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Config filename under the base directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Manages file system paths for the client.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for client files (~/.bloom)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.bloom`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".bloom"),
        })
    }

    /// Create a Paths instance with a custom base directory (for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Base directory for client files.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Path to the log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Ensure the base directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
