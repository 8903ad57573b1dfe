//! Locating and reading `json-lineage` TOML configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stream::{CONVERTER_BIN_ENV, DEFAULT_TERMINATE_GRACE};

/// Adapter configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    /// Explicit converter binary. `None` uses the conventional location.
    pub converter_path: Option<PathBuf>,
    /// Treat input as non-well-formed JSON by default.
    pub messy: bool,
    /// Milliseconds a blocking stream waits for a signalled converter.
    pub terminate_grace_ms: u64,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            converter_path: None,
            messy: false,
            terminate_grace_ms: u64::try_from(DEFAULT_TERMINATE_GRACE.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

impl LineageConfig {
    /// The termination grace period as a `Duration`.
    #[must_use]
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    /// Apply the `JSON_LINEAGE_BIN` override, if set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = std::env::var_os(CONVERTER_BIN_ENV) {
            tracing::debug!(path = ?path, "Converter path overridden by environment");
            self.converter_path = Some(PathBuf::from(path));
        }
        self
    }
}

/// Finds the configuration file, checking candidate paths in order.
#[derive(Debug)]
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loader over `.json-lineage.toml` then the per-user config file.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // project-local file first
        search_paths.push(PathBuf::from(".json-lineage.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("json-lineage").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Loader that only considers `path` (the CLI `--config` flag).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Read the first existing candidate, falling back to defaults.
    ///
    /// `JSON_LINEAGE_BIN` is applied on top of the result either way.
    ///
    /// # Errors
    ///
    /// A candidate that exists but cannot be read or parsed is an error;
    /// later candidates are not tried.
    pub fn load(&self) -> Result<LineageConfig, ConfigError> {
        let config = match self.find_config_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Reading lineage config");
                read_file(&path)?
            }
            None => {
                tracing::debug!("No lineage config present");
                LineageConfig::default()
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Candidate files, highest priority first.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// The candidate that would be read, if any exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|candidate| candidate.is_file()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(path: &Path) -> Result<LineageConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// A configuration file was found but is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
