//! Core runtime configuration.
//!
//! # Responsibility
//! - Parse TOML configuration with defaults for every field.
//! - Apply environment overrides and validate the result.
//!
//! # Invariants
//! - A missing `[remote] base_url` means local-only operation.
//! - `DOCFLOW_API_BASE` set to an empty string disables the remote.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_BASE: &str = "DOCFLOW_API_BASE";
pub const ENV_DB_PATH: &str = "DOCFLOW_DB_PATH";
pub const DEFAULT_DB_PATH: &str = "docflow.sqlite3";
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory. File logging stays off when absent.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Applies `DOCFLOW_API_BASE` and `DOCFLOW_DB_PATH` from the process
    /// environment.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable source.
    pub fn apply_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(ENV_API_BASE) {
            let trimmed = base.trim();
            self.remote.base_url = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            if !path.trim().is_empty() {
                self.storage.db_path = PathBuf::from(path.trim());
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "remote.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(base) = &self.remote.base_url {
            let trimmed = base.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Invalid(
                    "remote.base_url cannot be empty".to_string(),
                ));
            }
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "remote.base_url must use http or https, got `{trimmed}`"
                )));
            }
        }
        if self.storage.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.db_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn remote_base_url(&self) -> Option<&str> {
        self.remote.base_url.as_deref()
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.timeout_ms)
    }
}
