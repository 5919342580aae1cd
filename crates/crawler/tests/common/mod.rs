#![allow(dead_code)]

use async_trait::async_trait;
use ccrawler::persister::COLUMNS;
use ccrawler::{SqlValue, Statement, StatementExecutor};
use ccrawler_common::{ExchangeRateRow, FetchError, QuoteRecord, StorageError};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory `exchange_rates` with a primary key on `id`.
/// A batch is accepted or rejected as a whole.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<String, ExchangeRateRow>>,
    pub statements: AtomicUsize,
}

impl MemoryStore {
    pub fn row(&self, id: &str) -> Option<ExchangeRateRow> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }
}

fn text(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(v) => v.clone(),
        other => panic!("expected text, got {:?}", other),
    }
}

fn float(value: &SqlValue) -> f64 {
    match value {
        SqlValue::Float(v) => *v,
        other => panic!("expected float, got {:?}", other),
    }
}

fn bigint(value: &SqlValue) -> i64 {
    match value {
        SqlValue::BigInt(v) => *v,
        other => panic!("expected bigint, got {:?}", other),
    }
}

#[async_trait]
impl StatementExecutor for MemoryStore {
    async fn execute(&self, statement: &Statement) -> Result<u64, StorageError> {
        self.statements.fetch_add(1, Ordering::SeqCst);

        if !statement.sql.starts_with("INSERT INTO exchange_rates") {
            return Ok(0);
        }

        let batch: Vec<ExchangeRateRow> = statement
            .params
            .chunks(COLUMNS.len())
            .map(|p| ExchangeRateRow {
                id: text(&p[0]),
                symbol: text(&p[1]),
                name: text(&p[2]),
                price: float(&p[3]),
                volume: Some(float(&p[4])),
                supply: Some(bigint(&p[5])),
                percentage: Some(float(&p[6])),
                timestamp: Some(bigint(&p[7])),
            })
            .collect();

        let mut rows = self.rows.lock().unwrap();
        let mut seen = HashSet::new();
        for row in &batch {
            if rows.contains_key(&row.id) || !seen.insert(row.id.clone()) {
                return Err(StorageError::UniqueViolation(format!(
                    "duplicate key value violates unique constraint \"exchange_rates_pkey\": {}",
                    row.id
                )));
            }
        }

        let count = batch.len() as u64;
        for row in batch {
            rows.insert(row.id.clone(), row);
        }
        Ok(count)
    }
}

/// Replays a scripted sequence of fetch results, then keeps returning the last one
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<QuoteRecord>, FetchError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<QuoteRecord>, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ccrawler::QuoteSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<QuoteRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            if let Some(result) = script.pop_front() {
                return result;
            }
        }
        script.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn bitcoin() -> QuoteRecord {
    QuoteRecord {
        volume: 0.0,
        supply: 21_000_000,
        percentage: 1.5,
        ..QuoteRecord::new("BTC", "Bitcoin", 123.45)
    }
}

pub fn sample_snapshot() -> Vec<QuoteRecord> {
    vec![
        QuoteRecord::new("ZEC", "Zcash", 30.25),
        bitcoin(),
        QuoteRecord::new("ETH", "Ethereum", 3000.5),
    ]
}
