//! Per-instrument incremental indicator update.

use super::engine::IndicatorEngine;
use super::series::SeriesBuffer;
use super::store::IndicatorStore;
use crate::config::UpdaterConfig;
use crate::error::{AppError, Result};
use crate::types::{BackfillSummary, InstrumentId, UpdateOutcome, UpsertOutcome};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Computes and stores indicator rows for one instrument at a time.
pub struct IncrementalUpdater {
    store: Arc<dyn IndicatorStore>,
    engine: Arc<IndicatorEngine>,
    config: UpdaterConfig,
}

impl IncrementalUpdater {
    pub fn new(store: Arc<dyn IndicatorStore>, engine: Arc<IndicatorEngine>, config: UpdaterConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn store(&self) -> Arc<dyn IndicatorStore> {
        Arc::clone(&self.store)
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    /// Recompute and upsert the row for `target_date`.
    ///
    /// Reads the trailing lookback window ending at `target_date`. Re-running
    /// with unchanged bars leaves the stored row unchanged.
    pub async fn update(&self, instrument_id: InstrumentId, target_date: NaiveDate) -> Result<UpdateOutcome> {
        let buffer = self
            .load_series(instrument_id, target_date, self.config.lookback_bars)
            .await?;
        self.ensure_history(buffer.len())?;

        let row = self.engine.compute_for_date(&buffer, target_date)?;
        let defined_fields = row.defined_count();

        let store = Arc::clone(&self.store);
        let upsert = tokio::task::spawn_blocking(move || store.upsert_indicator_row(&row)).await??;

        debug!(
            "Instrument {} {}: {:?} with {} indicators",
            instrument_id, target_date, upsert, defined_fields
        );
        Ok(UpdateOutcome {
            instrument_id,
            trade_date: target_date,
            upsert,
            defined_fields,
        })
    }

    /// Recompute every trade date in `from..=to`.
    ///
    /// Each date uses the same trailing window as [`update`](Self::update),
    /// so backfilled rows match what the daily run would have written. Dates
    /// with too little history are counted as skipped. All rows are written
    /// in one storage call.
    pub async fn backfill(&self, instrument_id: InstrumentId, from: NaiveDate, to: NaiveDate) -> Result<BackfillSummary> {
        if from > to {
            return Err(AppError::Validation(format!(
                "backfill range is empty: {} is after {}",
                from, to
            )));
        }

        let days_in_range = (to - from).num_days() as usize + 1;
        let lookback = self.config.lookback_bars;
        let buffer = self
            .load_series(instrument_id, to, lookback.saturating_add(days_in_range))
            .await?;

        let dates = buffer.dates();
        let in_range = dates.iter().filter(|d| (from..=to).contains(*d)).count() as u32;
        let min_bars = self.config.min_history_bars.max(1);

        // First date with enough bars behind it
        let Some(first_eligible) = dates
            .get(min_bars - 1)
            .copied()
            .map(|d| d.max(from))
            .filter(|d| *d <= to)
        else {
            info!(
                "Backfill {} {}..={}: no date has {} bars of history",
                instrument_id, from, to, min_bars
            );
            return Ok(BackfillSummary {
                dates_skipped: in_range,
                ..BackfillSummary::default()
            });
        };

        let rows = self
            .engine
            .compute_history(&buffer, first_eligible..=to, lookback)?;
        let mut summary = BackfillSummary {
            dates_skipped: in_range - rows.len() as u32,
            ..BackfillSummary::default()
        };

        let store = Arc::clone(&self.store);
        let outcomes = tokio::task::spawn_blocking(move || store.upsert_indicator_rows(&rows)).await??;
        for outcome in outcomes {
            match outcome {
                UpsertOutcome::Inserted => summary.rows_inserted += 1,
                UpsertOutcome::Updated => summary.rows_updated += 1,
            }
        }

        info!(
            "Backfill {} {}..={}: {} inserted, {} updated, {} skipped",
            instrument_id, from, to, summary.rows_inserted, summary.rows_updated, summary.dates_skipped
        );
        Ok(summary)
    }

    async fn load_series(&self, instrument_id: InstrumentId, end_date: NaiveDate, max_bars: usize) -> Result<SeriesBuffer> {
        let store = Arc::clone(&self.store);
        let raw = tokio::task::spawn_blocking(move || store.read_bars(instrument_id, end_date, max_bars)).await??;
        SeriesBuffer::new(instrument_id, raw)
    }

    fn ensure_history(&self, actual: usize) -> Result<()> {
        let required = self.config.min_history_bars;
        if actual < required {
            return Err(AppError::InsufficientData { required, actual });
        }
        Ok(())
    }
}
