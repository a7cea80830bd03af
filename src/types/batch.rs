use super::InstrumentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an upsert created a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Result of updating one instrument for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub instrument_id: InstrumentId,
    pub trade_date: NaiveDate,
    pub upsert: UpsertOutcome,
    /// Number of indicators that had enough history to be computed.
    pub defined_fields: usize,
}

/// Result of recomputing a date range for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillSummary {
    pub rows_inserted: u32,
    pub rows_updated: u32,
    /// Trade dates in range with too little history to compute.
    pub dates_skipped: u32,
}

/// One instrument that failed during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentFailure {
    /// `None` when the worker task panicked before reporting.
    pub instrument_id: Option<InstrumentId>,
    pub symbol: String,
    pub kind: String,
    pub message: String,
}

/// Summary returned by `run_daily_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub target_date: NaiveDate,
    pub success: bool,
    /// Attempts made, including the final one.
    pub attempts: u32,
    pub processed: u32,
    pub inserted: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub failures: Vec<InstrumentFailure>,
    pub error: Option<String>,
    pub duration_ms: i64,
}

impl BatchReport {
    /// Report for a run that never got past start-up.
    pub fn aborted(run_id: Uuid, target_date: NaiveDate, attempts: u32, error: String, duration_ms: i64) -> Self {
        Self {
            run_id,
            target_date,
            success: false,
            attempts,
            processed: 0,
            inserted: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
            error: Some(error),
            duration_ms,
        }
    }

    /// Instruments whose row was written.
    pub fn succeeded(&self) -> u32 {
        self.inserted + self.updated
    }
}
