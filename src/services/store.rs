//! Storage collaborator used by the updater and orchestrator.

use crate::error::Result;
use crate::types::{IndicatorRow, Instrument, InstrumentId, RawBar, UpdateLog, UpsertOutcome};
use chrono::NaiveDate;

/// Blocking storage operations.
///
/// Async callers run these through `tokio::task::spawn_blocking`.
pub trait IndicatorStore: Send + Sync {
    /// Instruments included in the daily batch.
    fn list_active_instruments(&self) -> Result<Vec<Instrument>>;

    fn find_instrument(&self, symbol: &str) -> Result<Option<Instrument>>;

    /// Up to `max_count` most recent bars on or before `end_date`, oldest first.
    fn read_bars(&self, instrument_id: InstrumentId, end_date: NaiveDate, max_count: usize) -> Result<Vec<RawBar>>;

    /// Insert a row, or overwrite only the fields `row` defines.
    fn upsert_indicator_row(&self, row: &IndicatorRow) -> Result<UpsertOutcome>;

    /// Upsert several rows. Implementations may make this atomic.
    fn upsert_indicator_rows(&self, rows: &[IndicatorRow]) -> Result<Vec<UpsertOutcome>> {
        rows.iter().map(|row| self.upsert_indicator_row(row)).collect()
    }

    fn read_indicator_row(&self, instrument_id: InstrumentId, trade_date: NaiveDate) -> Result<Option<IndicatorRow>>;

    fn read_latest_indicator_row(&self, instrument_id: InstrumentId) -> Result<Option<IndicatorRow>>;

    /// Persist a new log and return its id.
    fn create_update_log(&self, log: &UpdateLog) -> Result<i64>;

    /// Overwrite counts and status of an existing log.
    fn finish_update_log(&self, log: &UpdateLog) -> Result<()>;

    /// Delete logs for update dates before `before`. Returns the number removed.
    fn cleanup_old_logs(&self, before: NaiveDate) -> Result<usize>;
}
