pub mod cache;
pub mod engine;
pub mod indicators;
pub mod orchestrator;
pub mod schedule;
pub mod series;
pub mod signal_service;
pub mod sqlite_store;
pub mod store;
pub mod updater;

pub use cache::{Cache, CacheStats};
pub use engine::{IndicatorEngine, IndicatorParams};
pub use orchestrator::{backoff_delay, BatchCounters, BatchOrchestrator, CancelHandle};
pub use schedule::{duration_until_next_run, next_run_after};
pub use series::SeriesBuffer;
pub use signal_service::SignalService;
pub use sqlite_store::SqliteStore;
pub use store::IndicatorStore;
pub use updater::IncrementalUpdater;
