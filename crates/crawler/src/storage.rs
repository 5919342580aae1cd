//! Storage handle: anything that accepts a parameterized statement.
//!
//! The pipeline only ever sees [`StatementExecutor`]; [`PgStore`] is the
//! PostgreSQL implementation backed by a single long-lived connection.

use async_trait::async_trait;
use ccrawler_common::{ExchangeRateRow, StorageError};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

/// A positional parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Float(f64),
    BigInt(i64),
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

/// Statement skeleton plus its `$n` parameters, in order.
/// Record values only ever travel in `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Runs one statement, returning the number of affected rows
    async fn execute(&self, statement: &Statement) -> Result<u64, StorageError>;
}

/// PostgreSQL handle. One connection for the whole process, no pool;
/// overlapping callers queue on the mutex.
pub struct PgStore {
    conn: Mutex<PgConnection>,
}

impl PgStore {
    /// Opens a connection and verifies it with a ping
    pub async fn open(options: &PgConnectOptions) -> Result<Self, StorageError> {
        let mut conn = PgConnection::connect_with(options)
            .await
            .map_err(storage_error)?;
        conn.ping().await.map_err(storage_error)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<ExchangeRateRow>, StorageError> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query(
            r#"
            SELECT id, symbol, name, price, volume, supply, percentage, timestamp
            FROM exchange_rates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // price/volume/percentage are `real` columns
        Ok(Some(ExchangeRateRow {
            id: row.try_get("id").map_err(storage_error)?,
            symbol: row.try_get("symbol").map_err(storage_error)?,
            name: row.try_get("name").map_err(storage_error)?,
            price: f64::from(row.try_get::<f32, _>("price").map_err(storage_error)?),
            volume: row
                .try_get::<Option<f32>, _>("volume")
                .map_err(storage_error)?
                .map(f64::from),
            supply: row.try_get("supply").map_err(storage_error)?,
            percentage: row
                .try_get::<Option<f32>, _>("percentage")
                .map_err(storage_error)?
                .map(f64::from),
            timestamp: row.try_get("timestamp").map_err(storage_error)?,
        }))
    }

    pub async fn close(self) -> Result<(), StorageError> {
        self.conn.into_inner().close().await.map_err(storage_error)
    }
}

#[async_trait]
impl StatementExecutor for PgStore {
    async fn execute(&self, statement: &Statement) -> Result<u64, StorageError> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = match param {
                SqlValue::Text(v) => query.bind(v.clone()),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::BigInt(v) => query.bind(*v),
            };
        }

        let mut conn = self.conn.lock().await;
        let result = query.execute(&mut *conn).await.map_err(storage_error)?;

        debug!(rows = result.rows_affected(), "Statement executed");
        Ok(result.rows_affected())
    }
}

pub(crate) fn storage_error(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::UniqueViolation(db.message().to_string());
        }
    }
    StorageError::Database(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_binds_in_order() {
        let stmt = Statement::new("SELECT $1, $2, $3")
            .bind("BTC")
            .bind(1.5)
            .bind(42i64);

        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Text("BTC".to_string()),
                SqlValue::Float(1.5),
                SqlValue::BigInt(42),
            ]
        );
    }

    #[test]
    fn test_non_database_error_maps_to_database_variant() {
        let err = storage_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StorageError::Database(_)));
    }
}
