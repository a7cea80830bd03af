//! Memoized signal lookups for stored indicator rows.

use super::cache::Cache;
use super::engine::IndicatorEngine;
use super::store::IndicatorStore;
use crate::error::{AppError, Result};
use crate::types::{InstrumentId, LatestSignals};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Serves the signal set of each instrument's latest stored row.
///
/// Results are cached per instrument for the configured TTL. Call
/// [`invalidate`](Self::invalidate) after writing a newer row.
pub struct SignalService {
    store: Arc<dyn IndicatorStore>,
    engine: Arc<IndicatorEngine>,
    cache: Cache<LatestSignals>,
}

impl SignalService {
    pub fn new(store: Arc<dyn IndicatorStore>, engine: Arc<IndicatorEngine>, ttl: Duration) -> Self {
        Self {
            store,
            engine,
            cache: Cache::new(ttl),
        }
    }

    fn key(instrument_id: InstrumentId) -> String {
        format!("signals:{}", instrument_id)
    }

    /// Signals for the most recent stored row and the close on that date.
    ///
    /// Fails with `NotFound` when the instrument has no stored row or no bar
    /// on the row's date.
    pub async fn latest_signals(&self, instrument_id: InstrumentId) -> Result<LatestSignals> {
        let key = Self::key(instrument_id);
        if let Some(hit) = self.cache.get(&key) {
            debug!("Signal cache hit for instrument {}", instrument_id);
            return Ok(hit);
        }

        let store = Arc::clone(&self.store);
        let (row, bars) = tokio::task::spawn_blocking(move || -> Result<_> {
            let row = store
                .read_latest_indicator_row(instrument_id)?
                .ok_or_else(|| AppError::NotFound(format!("indicators for instrument {}", instrument_id)))?;
            let bars = store.read_bars(instrument_id, row.trade_date, 1)?;
            Ok((row, bars))
        })
        .await??;

        let last_close = bars
            .last()
            .filter(|b| b.trade_date == row.trade_date)
            .and_then(|b| b.close)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "close for instrument {} on {}",
                    instrument_id, row.trade_date
                ))
            })?;

        let latest = LatestSignals {
            instrument_id,
            trade_date: row.trade_date,
            last_close,
            signals: self.engine.latest_signals(&row, last_close),
        };
        debug!(
            "Signals for instrument {} on {}: {}",
            instrument_id,
            latest.trade_date,
            latest.signals.overall.label()
        );
        self.cache.set(key, latest.clone());
        Ok(latest)
    }

    pub fn invalidate(&self, instrument_id: InstrumentId) -> bool {
        self.cache.invalidate(&Self::key(instrument_id))
    }

    pub fn cache(&self) -> &Cache<LatestSignals> {
        &self.cache
    }
}
