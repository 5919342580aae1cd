use std::time::Duration;
use thiserror::Error;

/// Snapshot retrieval failures. Contained to the run that raised them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to quote source failed: {0}")]
    Transport(String),

    #[error("Quote source returned error status: {0}")]
    Status(u16),

    #[error("Cannot decode quote snapshot: {0}")]
    Decode(String),
}

/// Failures reported by the storage handle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Duplicate key: {0}")]
    UniqueViolation(String),
}

/// Startup connection failure. Fatal: nothing can run without a handle.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid connection options: {0}")]
    InvalidOptions(String),

    #[error("After {attempts} attempts, last error: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

/// Table creation failure. Reported and swallowed.
#[derive(Error, Debug)]
#[error("Schema creation skipped: {0}")]
pub struct SchemaError(#[from] pub StorageError);

/// Batch insert failure, including minute-bucket collisions
#[derive(Error, Debug)]
#[error("Batch of {rows} rows rejected after {elapsed:?}: {source}")]
pub struct PersistError {
    pub rows: usize,
    pub elapsed: Duration,
    #[source]
    pub source: StorageError,
}

impl PersistError {
    /// True when the storage layer rejected the batch on its primary key,
    /// i.e. this minute bucket was already ingested.
    pub fn is_bucket_collision(&self) -> bool {
        matches!(self.source, StorageError::UniqueViolation(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}
