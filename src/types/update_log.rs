use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a batch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Processing,
    Completed,
    Failed,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Processing => "processing",
            UpdateStatus::Completed => "completed",
            UpdateStatus::Failed => "failed",
        }
    }

    /// Parse from the stored string. Unknown values read as failed.
    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => UpdateStatus::Processing,
            "completed" => UpdateStatus::Completed,
            _ => UpdateStatus::Failed,
        }
    }
}

/// One record per orchestrated batch attempt.
///
/// Created when the attempt starts and finalized by the same attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLog {
    /// Storage id, assigned on insert.
    pub id: Option<i64>,
    /// Shared by every attempt of one `run_daily_update` call.
    pub run_id: Uuid,
    pub attempt: u32,
    pub update_date: NaiveDate,
    pub data_source: String,
    pub records_processed: u32,
    pub records_inserted: u32,
    pub records_updated: u32,
    pub records_failed: u32,
    pub status: UpdateStatus,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    /// Unix millis.
    pub created_at: i64,
    /// Unix millis.
    pub completed_at: Option<i64>,
}

impl UpdateLog {
    /// A new log in `processing` state.
    pub fn start(run_id: Uuid, attempt: u32, update_date: NaiveDate, data_source: &str) -> Self {
        Self {
            id: None,
            run_id,
            attempt,
            update_date,
            data_source: data_source.to_string(),
            records_processed: 0,
            records_inserted: 0,
            records_updated: 0,
            records_failed: 0,
            status: UpdateStatus::Processing,
            error_message: None,
            execution_time_ms: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            completed_at: None,
        }
    }

    /// Mark the attempt finished with the given status.
    pub fn finish(&mut self, status: UpdateStatus, error: Option<String>, elapsed_ms: i64) {
        self.status = status;
        self.error_message = error;
        self.execution_time_ms = Some(elapsed_ms);
        self.completed_at = Some(chrono::Utc::now().timestamp_millis());
    }
}
