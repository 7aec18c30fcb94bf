// src/config.rs
//! Configuration file parsing for fleetpack
//!
//! Supports a TOML file with the following sections:
//! - [database] - SQLite file location and lock wait
//! - [logging] - Default tracing filter
//!
//! Every field has a default, and a missing file yields the defaults.
//! `FLEETPACK_DB` overrides the database path after the file is read.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the binary looks for its config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fleetpack/config.toml";

/// Environment variable that overrides `[database] path`
pub const DB_PATH_ENV: &str = "FLEETPACK_DB";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Database configuration section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSection {
    /// Path to the SQLite file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// How long to wait on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/var/lib/fleetpack/fleetpack.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load from `path` (or the default location), then apply the environment override
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_file(path)?;

        if let Ok(db) = std::env::var(DB_PATH_ENV) {
            if !db.is_empty() {
                config.database.path = PathBuf::from(db);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file; a file that does not exist yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(Error::ConfigError("database.path must not be empty".to_string()));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(Error::ConfigError("logging.filter must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    /// Database path as the string form `db::open` takes
    pub fn db_path(&self) -> Result<&str> {
        self.database.path.to_str().ok_or_else(|| {
            Error::ConfigError(format!(
                "database.path is not valid UTF-8: {}",
                self.database.path.display()
            ))
        })
    }
}
