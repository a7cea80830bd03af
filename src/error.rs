use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed input bars. Fatal to the series being built, not to a batch.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Library misuse such as a zero period.
    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Insufficient data: need {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage unreachable or write rejected.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Batch exceeded its time limit after {elapsed_ms}ms")]
    BatchTimeout { elapsed_ms: u64 },

    #[error("Batch cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Computation(_) => "computation",
            AppError::InsufficientData { .. } => "insufficient_data",
            AppError::NotFound(_) => "not_found",
            AppError::Persistence(_) => "persistence",
            AppError::BatchTimeout { .. } => "batch_timeout",
            AppError::Cancelled => "cancelled",
            AppError::Internal(_) => "internal",
        }
    }

    /// Errors worth retrying the whole batch for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }

    /// Expected gaps in history: the instrument is skipped, not failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, AppError::InsufficientData { .. } | AppError::NotFound(_))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("worker task failed: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_is_retryable() {
        assert!(AppError::Persistence("locked".into()).is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
        assert!(!AppError::BatchTimeout { elapsed_ms: 10 }.is_retryable());
        assert!(!AppError::Cancelled.is_retryable());
    }

    #[test]
    fn test_skip_classification() {
        assert!(AppError::InsufficientData { required: 20, actual: 3 }.is_skip());
        assert!(AppError::NotFound("bar".into()).is_skip());
        assert!(!AppError::Computation("period".into()).is_skip());
    }

    #[test]
    fn test_display_messages() {
        let err = AppError::InsufficientData { required: 20, actual: 5 };
        assert_eq!(err.to_string(), "Insufficient data: need 20 bars, got 5");
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn test_rusqlite_error_maps_to_persistence() {
        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AppError::Persistence(_)));
    }
}
