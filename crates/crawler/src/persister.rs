use crate::storage::{Statement, StatementExecutor};
use ccrawler_common::{ExchangeRateRow, MinuteBucket, PersistError, QuoteRecord};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Column order of every value tuple
pub const COLUMNS: [&str; 8] = [
    "id",
    "symbol",
    "name",
    "price",
    "volume",
    "supply",
    "percentage",
    "timestamp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    pub rows: usize,
    pub elapsed: Duration,
}

/// Builds the multi-row insert for one batch.
///
/// Returns `None` for an empty batch: an insert without value rows is never
/// sent. Only placeholders go into the SQL text; every record value is a
/// positional parameter.
pub fn build_insert(quotes: &[QuoteRecord], bucket: MinuteBucket) -> Option<Statement> {
    if quotes.is_empty() {
        return None;
    }

    let width = COLUMNS.len();
    let tuples: Vec<String> = (0..quotes.len())
        .map(|row| {
            let placeholders: Vec<String> =
                (1..=width).map(|col| format!("${}", row * width + col)).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    let sql = format!(
        "INSERT INTO exchange_rates({}) VALUES {}",
        COLUMNS.join(", "),
        tuples.join(", ")
    );

    let statement = quotes
        .iter()
        .map(|quote| ExchangeRateRow::from_quote(quote, bucket))
        .fold(Statement::new(sql), |stmt, row| {
            stmt.bind(row.id)
                .bind(row.symbol)
                .bind(row.name)
                .bind(row.price)
                .bind(row.volume.unwrap_or_default())
                .bind(row.supply.unwrap_or_default())
                .bind(row.percentage.unwrap_or_default())
                .bind(bucket.as_i64())
        });

    Some(statement)
}

/// Writes one batch in a single round trip. The storage layer decides for
/// the batch as a whole; there is no row-level retry or partial credit.
pub async fn persist<E>(
    executor: &E,
    quotes: &[QuoteRecord],
    bucket: MinuteBucket,
) -> Result<PersistReport, PersistError>
where
    E: StatementExecutor + ?Sized,
{
    let start = Instant::now();

    let Some(statement) = build_insert(quotes, bucket) else {
        info!(%bucket, "No exchange rates to insert");
        return Ok(PersistReport {
            rows: 0,
            elapsed: start.elapsed(),
        });
    };

    info!(%bucket, rows = quotes.len(), "Inserting exchange rate datapoints");

    match executor.execute(&statement).await {
        Ok(_) => {
            let report = PersistReport {
                rows: quotes.len(),
                elapsed: start.elapsed(),
            };
            info!(rows = report.rows, elapsed = ?report.elapsed, "✅ Exchange rates stored");
            Ok(report)
        }
        Err(source) => {
            let err = PersistError {
                rows: quotes.len(),
                elapsed: start.elapsed(),
                source,
            };
            warn!(
                %bucket,
                elapsed = ?err.elapsed,
                collision = err.is_bucket_collision(),
                error = %err.source,
                "Adding new exchange rates skipped"
            );
            Err(err)
        }
    }
}
