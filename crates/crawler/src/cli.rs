use ccrawler_common::config::{OverlapPolicy, Settings};
use ccrawler_common::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Crawls CoinCap exchange rates into PostgreSQL
#[derive(Parser, Debug, Default)]
#[command(name = "ccrawler", version)]
pub struct Cli {
    /// TOML settings file; flags and CCRAWLER_* variables override it
    #[arg(short, long, env = "CCRAWLER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "CCRAWLER_DBHOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "CCRAWLER_DBPORT")]
    pub db_port: Option<u16>,

    #[arg(long, env = "CCRAWLER_DBUSER")]
    pub db_user: Option<String>,

    #[arg(long, env = "CCRAWLER_DBPASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "CCRAWLER_DBNAME")]
    pub db_name: Option<String>,

    #[arg(long, env = "CCRAWLER_DBSSLMODE")]
    pub db_ssl_mode: Option<String>,

    /// Connection attempts at startup
    #[arg(long, env = "CCRAWLER_DBCONNECTIONRETRIES")]
    pub db_connection_retries: Option<u32>,

    /// Seconds between connection attempts
    #[arg(long, env = "CCRAWLER_DBCONNECTIONBACKOFF")]
    pub db_connection_backoff: Option<u64>,

    #[arg(long, env = "CCRAWLER_SOURCEURL")]
    pub source_url: Option<String>,

    /// Seconds between crawls, 0 crawls once
    #[arg(long, env = "CCRAWLER_INTERVAL")]
    pub interval_secs: Option<u64>,

    /// Crawl once and exit
    #[arg(long)]
    pub once: bool,

    /// Let a tick start while the previous crawl is still running
    #[arg(long)]
    pub allow_overlap: bool,

    /// Print build metadata and exit
    #[arg(long, env = "CCRAWLER_VERSION")]
    pub version_info: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags/env
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        let db = &mut settings.database;
        if let Some(host) = &self.db_host {
            db.host = host.clone();
        }
        if let Some(port) = self.db_port {
            db.port = port;
        }
        if let Some(user) = &self.db_user {
            db.user = user.clone();
        }
        if let Some(password) = &self.db_password {
            db.password = password.clone();
        }
        if let Some(name) = &self.db_name {
            db.name = name.clone();
        }
        if let Some(ssl_mode) = &self.db_ssl_mode {
            db.ssl_mode = ssl_mode.clone();
        }
        if let Some(retries) = self.db_connection_retries {
            db.connection_retries = retries;
        }
        if let Some(backoff) = self.db_connection_backoff {
            db.connection_backoff_secs = backoff;
        }

        if let Some(url) = &self.source_url {
            settings.source.url = url.clone();
        }

        if let Some(interval) = self.interval_secs {
            settings.schedule.interval_secs = interval;
        }
        if self.once {
            settings.schedule.interval_secs = 0;
        }
        if self.allow_overlap {
            settings.schedule.overlap = OverlapPolicy::Allow;
        }
    }
}
