use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One OHLCV record as delivered by an ingest producer or read back from storage.
///
/// Every value is optional because upstream providers occasionally drop
/// fields. Nothing is validated here; [`SeriesBuffer`](crate::services::SeriesBuffer)
/// rejects incomplete or out-of-range records when a series is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub trade_date: NaiveDate,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<i64>,
}

impl RawBar {
    /// Create a fully populated record.
    pub fn new(trade_date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Self {
        Self {
            trade_date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }
}

/// A validated daily bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A bar tagged with the instrument it belongs to, as found in ingest files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRecord {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub bar: RawBar,
}
