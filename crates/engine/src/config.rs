//! Suite configuration via `canopy.toml`
//!
//! Everything has a default; an empty file is a valid configuration.

use canopy_concurrency::StartPolicy;
use canopy_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name looked up next to the test sources.
pub const CONFIG_FILE_NAME: &str = "canopy.toml";

/// Suite configuration loaded from `canopy.toml`.
///
/// # Example
///
/// ```toml
/// # Run tests only when their result is awaited
/// lazy = false
///
/// # Worker threads; defaults to the available parallelism
/// # worker_threads = 4
///
/// thread_name_prefix = "canopy-worker"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Keep tests suspended until awaited instead of starting them eagerly.
    #[serde(default)]
    pub lazy: bool,
    /// Size of the worker pool; `None` uses the available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
    /// Prefix of worker thread names.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_thread_name_prefix() -> String {
    "canopy-worker".to_string()
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            lazy: false,
            worker_threads: None,
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl SuiteConfig {
    /// Start policy derived from `lazy`.
    pub fn start_policy(&self) -> StartPolicy {
        if self.lazy {
            StartPolicy::Lazy
        } else {
            StartPolicy::Eager
        }
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero-sized pool or an empty thread prefix.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(Error::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Canopy suite configuration
#
# Start tests only when their result is awaited (default: false)
lazy = false

# Number of worker threads (default: available parallelism)
# worker_threads = 4

# Prefix of worker thread names
thread_name_prefix = "canopy-worker"
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidConfig` if it cannot
    /// be parsed or holds invalid values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SuiteConfig = toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
