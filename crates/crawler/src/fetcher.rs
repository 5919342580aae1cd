use async_trait::async_trait;
use ccrawler_common::{FetchError, QuoteRecord};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// CoinCap "front" endpoint: every listed coin in one JSON array
pub const DEFAULT_SOURCE_URL: &str = "http://coincap.io/front";
/// HTTP request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Quote source interface. One call is one snapshot; retrying is the
/// scheduler's business, not the source's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<QuoteRecord>, FetchError>;

    fn name(&self) -> &str;
}

/// Client for the CoinCap snapshot endpoint
pub struct CoinCapClient {
    client: Client,
    url: String,
}

impl CoinCapClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("CCrawler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Uses a preconfigured client, e.g. one with custom proxy settings
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch_once(&self) -> Result<Vec<QuoteRecord>, FetchError> {
        debug!(url = %self.url, "Calling quote source");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        decode_quotes(&body)
    }
}

#[async_trait]
impl QuoteSource for CoinCapClient {
    async fn fetch(&self) -> Result<Vec<QuoteRecord>, FetchError> {
        let start = Instant::now();
        let quotes = self.fetch_once().await?;
        info!(
            count = quotes.len(),
            elapsed = ?start.elapsed(),
            "Fetched quote snapshot"
        );
        Ok(quotes)
    }

    fn name(&self) -> &str {
        "coincap"
    }
}

/// Decodes a snapshot body: a JSON array of coin objects. A bare `null`
/// is an empty snapshot.
pub fn decode_quotes(body: &[u8]) -> Result<Vec<QuoteRecord>, FetchError> {
    serde_json::from_slice::<Option<Vec<QuoteRecord>>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| FetchError::Decode(e.to_string()))
}
