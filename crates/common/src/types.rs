use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One coin entry of a quote-source snapshot.
///
/// Missing fields and explicit `null`s decode to zero values; only the first
/// six fields are persisted, the rest travel along for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    #[serde(rename = "short", default, deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(rename = "long", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volume: f64,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub supply: i64,
    #[serde(rename = "perc", default, deserialize_with = "null_as_default")]
    pub percentage: f64,

    #[serde(rename = "cap24hrChange", default, deserialize_with = "null_as_default")]
    pub change_24h: f64,
    #[serde(rename = "mktcap", default, deserialize_with = "null_as_default")]
    pub market_cap: f64,
    #[serde(rename = "usdVolume", default, deserialize_with = "null_as_default")]
    pub usd_volume: f64,
    #[serde(rename = "vwapData", default, deserialize_with = "null_as_default")]
    pub vwap: f64,
    #[serde(rename = "vwapDataBTC", default, deserialize_with = "null_as_default")]
    pub vwap_btc: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shapeshift: bool,
}

impl QuoteRecord {
    /// Shorthand used by tests and fixtures
    pub fn new(symbol: &str, name: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            ..Default::default()
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Supply comes as an integer most of the time, occasionally as a float.
fn lenient_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(match number {
        None => 0,
        Some(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .unwrap_or_else(|| n.as_f64().map(|v| v.trunc() as i64).unwrap_or_default()),
    })
}

/// A UTC wall-clock minute in `YYYYMMDDhhmm` digit form.
///
/// All rows of one ingestion run share a single bucket, so two runs within
/// the same minute produce colliding primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MinuteBucket(i64);

impl MinuteBucket {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let value = i64::from(at.year()) * 100_000_000
            + i64::from(at.month()) * 1_000_000
            + i64::from(at.day()) * 10_000
            + i64::from(at.hour()) * 100
            + i64::from(at.minute());
        Self(value)
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Primary key of the row for `symbol` in this bucket
    pub fn row_id(&self, symbol: &str) -> String {
        format!("{}_{}", self.0, symbol)
    }
}

impl From<i64> for MinuteBucket {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MinuteBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted `exchange_rates` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRow {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub volume: Option<f64>,
    pub supply: Option<i64>,
    pub percentage: Option<f64>,
    pub timestamp: Option<i64>,
}

impl ExchangeRateRow {
    pub fn from_quote(quote: &QuoteRecord, bucket: MinuteBucket) -> Self {
        Self {
            id: bucket.row_id(&quote.symbol),
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            price: quote.price,
            volume: Some(quote.volume),
            supply: Some(quote.supply),
            percentage: Some(quote.percentage),
            timestamp: Some(bucket.as_i64()),
        }
    }
}
