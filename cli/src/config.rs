//! Optional YAML configuration for the `userstore` binary.
//!
//! # Example YAML
//!
//! ```yaml
//! database: users.db
//! busy_timeout_ms: 5000
//! operation_timeout_ms: 30000
//! ```
//!
//! Every field is optional; command-line flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use userstore_core::Context;
use userstore_sqlite::StoreOptions;

/// Database file used when neither the config file nor `--db` names one.
pub const DEFAULT_DATABASE: &str = "users.db";

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Database file path, or `:memory:`.
    pub database: PathBuf,
    /// Store-level settings (`busy_timeout_ms`).
    #[serde(flatten)]
    pub store: StoreOptions,
    /// Deadline applied to each store operation; unlimited when absent.
    pub operation_timeout_ms: Option<u64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            store: StoreOptions::default(),
            operation_timeout_ms: None,
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration from YAML text. An empty document yields the
    /// defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Derives the context for a single store operation.
    pub fn operation_context(&self, root: &Context) -> Context {
        match self.operation_timeout() {
            Some(timeout) => root.with_timeout(timeout),
            None => root.child(),
        }
    }
}
