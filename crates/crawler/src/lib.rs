pub mod cli;
pub mod connection;
pub mod fetcher;
pub mod normalizer;
pub mod persister;
pub mod pipeline;
pub mod scheduler;
pub mod storage;
pub mod version;

pub use fetcher::{CoinCapClient, QuoteSource};
pub use pipeline::{Pipeline, TickError, TickReport};
pub use scheduler::{Job, Schedule, Scheduler};
pub use storage::{PgStore, SqlValue, Statement, StatementExecutor};
