use anyhow::{Context, Result};
use ccrawler::cli::Cli;
use ccrawler::connection::{connect, ensure_schema};
use ccrawler::version::VersionInfo;
use ccrawler::{CoinCapClient, Pipeline, Schedule, Scheduler};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version_info {
        println!("{}", version);
        return Ok(());
    }

    let settings = cli.settings().context("Failed to load settings")?;

    info!(%version, "CCrawler starting");
    info!(
        database = ?settings.database,
        source = %settings.source.url,
        interval_secs = settings.schedule.interval_secs,
        overlap = ?settings.schedule.overlap,
        "Used config values"
    );

    // No pipeline can run without the handle, so this one is fatal
    let store = Arc::new(
        connect(&settings.database)
            .await
            .context("Initialize DB connection unsuccessful")?,
    );
    ensure_schema(store.as_ref()).await;

    let source = CoinCapClient::new(settings.source.url.clone(), settings.source.timeout())
        .context("Failed to create quote source client")?;
    let pipeline = Arc::new(Pipeline::new(source, store.clone()));

    let scheduler = Scheduler::new(
        Schedule::from_interval_secs(settings.schedule.interval_secs),
        settings.schedule.overlap,
    );
    let result = scheduler.run(pipeline).await;

    // Only reached in once mode; the scheduler has dropped the pipeline's handle
    if let Ok(store) = Arc::try_unwrap(store) {
        if let Err(e) = store.close().await {
            warn!(error = %e, "Failed to close DB connection cleanly");
        }
    }

    result.context("Crawl run failed")
}
