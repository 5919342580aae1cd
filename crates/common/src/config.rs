//! Process settings: defaults, then an optional TOML file, then CLI/env overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub source: SourceSettings,
    pub schedule: ScheduleSettings,
}

/// PostgreSQL connection descriptor plus the startup retry policy
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// libpq-style mode: disable, allow, prefer, require, verify-ca, verify-full
    pub ssl_mode: String,
    pub connection_retries: u32,
    pub connection_backoff_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            name: "public".to_string(),
            ssl_mode: "disable".to_string(),
            connection_retries: 5,
            connection_backoff_secs: 3,
        }
    }
}

impl DatabaseSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.connection_backoff_secs)
    }
}

// The password never reaches the logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("name", &self.name)
            .field("ssl_mode", &self.ssl_mode)
            .field("connection_retries", &self.connection_retries)
            .field("connection_backoff_secs", &self.connection_backoff_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: "http://coincap.io/front".to_string(),
            timeout_secs: 10,
        }
    }
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What to do when a tick fires while the previous run is still going
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Drop the tick and log it
    #[default]
    Skip,
    /// Start another run next to the active one
    Allow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Seconds between ticks; 0 runs the pipeline once
    pub interval_secs: u64,
    pub overlap: OverlapPolicy,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            overlap: OverlapPolicy::Skip,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(raw)?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.connection_retries == 0 {
            return Err(ConfigError::Invalid(
                "database.connection_retries must be at least 1".to_string(),
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "source.timeout_secs must be positive".to_string(),
            ));
        }
        if self.source.url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.url is empty".to_string()));
        }
        Ok(())
    }
}
