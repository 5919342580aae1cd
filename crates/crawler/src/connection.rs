//! Startup connection with fixed-backoff retry, and best-effort schema creation.

use crate::storage::{PgStore, Statement, StatementExecutor};
use ccrawler_common::config::DatabaseSettings;
use ccrawler_common::{ConnectionError, SchemaError, StorageError};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Target table DDL. Issued once per process; failure is not fatal.
pub const CREATE_EXCHANGE_RATES: &str = r#"
CREATE TABLE IF NOT EXISTS exchange_rates (
    id VARCHAR(64) PRIMARY KEY,
    symbol VARCHAR(32) NOT NULL,
    name VARCHAR(128) NOT NULL,
    price REAL NOT NULL,
    volume REAL,
    supply BIGINT,
    percentage REAL,
    timestamp BIGINT
)"#;

/// Fixed-delay retry: `attempts` tries in total, `backoff` between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }
}

impl From<&DatabaseSettings> for RetryPolicy {
    fn from(db: &DatabaseSettings) -> Self {
        Self::new(db.connection_retries, db.backoff())
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. On exhaustion the error of the
/// last attempt is returned.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts => {
                error!(attempt, error = %e, "❌ All attempts failed");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    attempt,
                    of = policy.attempts,
                    error = %e,
                    backoff = ?policy.backoff,
                    "❌ Attempt failed, retrying"
                );
                sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Retries `open` per `policy`, wrapping exhaustion into a [`ConnectionError`]
pub async fn connect_with<T, F, Fut>(policy: &RetryPolicy, mut open: F) -> Result<T, ConnectionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    info!(
        retries = policy.attempts,
        backoff = ?policy.backoff,
        "Initializing DB connection"
    );

    let result = retry(policy, |attempt| {
        info!(attempt, "Connecting to database");
        open()
    })
    .await;

    match result {
        Ok(handle) => {
            info!("✅ DB connection established");
            Ok(handle)
        }
        Err(source) => Err(ConnectionError::Exhausted {
            attempts: policy.attempts,
            source,
        }),
    }
}

pub fn connect_options(db: &DatabaseSettings) -> Result<PgConnectOptions, ConnectionError> {
    let ssl_mode = PgSslMode::from_str(&db.ssl_mode)
        .map_err(|e| ConnectionError::InvalidOptions(e.to_string()))?;

    Ok(PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(&db.password)
        .database(&db.name)
        .ssl_mode(ssl_mode))
}

/// Opens and pings the process-wide PostgreSQL handle
pub async fn connect(db: &DatabaseSettings) -> Result<PgStore, ConnectionError> {
    let options = connect_options(db)?;
    let policy = RetryPolicy::from(db);

    connect_with(&policy, || PgStore::open(&options)).await
}

/// Result of the best-effort table creation
#[derive(Debug)]
pub enum SchemaOutcome {
    Ready,
    Skipped(SchemaError),
}

impl SchemaOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaOutcome::Ready)
    }
}

/// Creates `exchange_rates` if absent. Never fails the caller: an error is
/// logged and handed back as [`SchemaOutcome::Skipped`].
pub async fn ensure_schema<E>(executor: &E) -> SchemaOutcome
where
    E: StatementExecutor + ?Sized,
{
    match executor.execute(&Statement::new(CREATE_EXCHANGE_RATES)).await {
        Ok(_) => {
            info!("Schema creation successful");
            SchemaOutcome::Ready
        }
        Err(e) => {
            let err = SchemaError::from(e);
            warn!(error = %err, "Schema creation skipped");
            SchemaOutcome::Skipped(err)
        }
    }
}
