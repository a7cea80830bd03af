//! Daily indicators - technical indicator computation and incremental persistence
//! for daily OHLCV series.

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use services::{
    BatchOrchestrator, IncrementalUpdater, IndicatorEngine, IndicatorStore, SeriesBuffer,
    SignalService, SqliteStore,
};
pub use types::*;
