use crate::fetcher::QuoteSource;
use crate::normalizer::normalize;
use crate::persister::persist;
use crate::scheduler::Job;
use crate::storage::StatementExecutor;
use async_trait::async_trait;
use ccrawler_common::{FetchError, MinuteBucket, PersistError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Error, Debug)]
pub enum TickError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Persist failed: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub bucket: MinuteBucket,
    pub fetched: usize,
    pub persisted: usize,
    pub fetch_elapsed: Duration,
    pub persist_elapsed: Duration,
}

/// Fetch → normalize → persist, with the storage handle opened once at
/// startup and shared by every tick.
pub struct Pipeline<S, E> {
    source: S,
    store: Arc<E>,
    clock: Clock,
}

impl<S, E> Pipeline<S, E>
where
    S: QuoteSource,
    E: StatementExecutor,
{
    pub fn new(source: S, store: Arc<E>) -> Self {
        Self::with_clock(source, store, Arc::new(Utc::now))
    }

    pub fn with_clock(source: S, store: Arc<E>, clock: Clock) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<E> {
        &self.store
    }

    /// One full ingestion run. A fetch failure skips persistence.
    pub async fn run_tick(&self) -> Result<TickReport, TickError> {
        // one bucket for the whole batch, taken before the fetch
        let bucket = MinuteBucket::from_datetime((self.clock)());
        let start = Instant::now();
        info!(%bucket, source = self.source.name(), "Start crawling");

        let quotes = match self.source.fetch().await {
            Ok(quotes) => normalize(quotes),
            Err(e) => {
                warn!(%bucket, elapsed = ?start.elapsed(), error = %e, "Fetch failed, nothing to persist");
                return Err(e.into());
            }
        };
        let fetch_elapsed = start.elapsed();
        info!(count = quotes.len(), elapsed = ?fetch_elapsed, "Processing coins done");

        let report = persist(self.store.as_ref(), &quotes, bucket).await?;

        Ok(TickReport {
            bucket,
            fetched: quotes.len(),
            persisted: report.rows,
            fetch_elapsed,
            persist_elapsed: report.elapsed,
        })
    }
}

#[async_trait]
impl<S, E> Job for Pipeline<S, E>
where
    S: QuoteSource + 'static,
    E: StatementExecutor + 'static,
{
    type Error = TickError;

    async fn run(&self) -> Result<(), TickError> {
        let report = self.run_tick().await?;
        info!(
            bucket = %report.bucket,
            fetched = report.fetched,
            persisted = report.persisted,
            "Tick complete"
        );
        Ok(())
    }
}
