//! Daily batch update across the active instrument universe.

use super::store::IndicatorStore;
use super::updater::IncrementalUpdater;
use crate::config::BatchConfig;
use crate::error::{AppError, Result};
use crate::types::{
    BatchReport, Instrument, InstrumentFailure, UpdateLog, UpdateOutcome, UpdateStatus,
    UpsertOutcome,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Stops a running batch from dispatching further instruments.
///
/// Updates already in flight finish and are counted.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // register before checking the flag so a concurrent cancel is not missed
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Allow the next run to proceed.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Per-attempt outcome counts, shared with worker tasks.
#[derive(Debug, Default)]
pub struct BatchCounters {
    processed: AtomicU32,
    inserted: AtomicU32,
    updated: AtomicU32,
    skipped: AtomicU32,
    failed: AtomicU32,
    persistence_failures: AtomicU32,
}

impl BatchCounters {
    fn record(&self, result: &Result<UpdateOutcome>) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(outcome) => match outcome.upsert {
                UpsertOutcome::Inserted => self.inserted.fetch_add(1, Ordering::Relaxed),
                UpsertOutcome::Updated => self.updated.fetch_add(1, Ordering::Relaxed),
            },
            Err(e) if e.is_skip() => self.skipped.fetch_add(1, Ordering::Relaxed),
            Err(e) => {
                if matches!(e, AppError::Persistence(_)) {
                    self.persistence_failures.fetch_add(1, Ordering::Relaxed);
                }
                self.failed.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    fn record_lost_task(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u32 {
        Self::get(&self.processed)
    }

    pub fn inserted(&self) -> u32 {
        Self::get(&self.inserted)
    }

    pub fn updated(&self) -> u32 {
        Self::get(&self.updated)
    }

    pub fn skipped(&self) -> u32 {
        Self::get(&self.skipped)
    }

    pub fn failed(&self) -> u32 {
        Self::get(&self.failed)
    }

    /// Nothing was written and every failure was a storage error.
    fn looks_like_storage_outage(&self) -> bool {
        let failed = self.failed();
        failed > 0
            && self.inserted() + self.updated() == 0
            && Self::get(&self.persistence_failures) == failed
    }
}

/// Result of one attempt that got past start-up.
struct AttemptOutcome {
    counters: Arc<BatchCounters>,
    failures: Vec<InstrumentFailure>,
    error: Option<AppError>,
}

/// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let factor = 1u32
        .checked_shl(retry.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Runs the daily update for every active instrument.
pub struct BatchOrchestrator {
    store: Arc<dyn IndicatorStore>,
    updater: Arc<IncrementalUpdater>,
    config: BatchConfig,
    cancel: CancelHandle,
}

impl BatchOrchestrator {
    pub fn new(updater: Arc<IncrementalUpdater>, config: BatchConfig) -> Self {
        Self {
            store: updater.store(),
            updater,
            config,
            cancel: CancelHandle::default(),
        }
    }

    pub fn updater(&self) -> Arc<IncrementalUpdater> {
        Arc::clone(&self.updater)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Update every active instrument for `target_date`.
    ///
    /// Per-instrument failures are counted, never retried. A failure of the
    /// whole attempt (storage unreachable at start, or every instrument
    /// failing on storage) is retried with exponential backoff up to
    /// `max_retries` times. Each attempt writes its own update log; all
    /// attempts share one run id.
    pub async fn run_daily_update(&self, target_date: NaiveDate) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let max_attempts = self.config.max_retries.saturating_add(1);
        info!("Daily update {} for {} starting", run_id, target_date);

        let mut attempt = 1;
        loop {
            if self.cancel.is_cancelled() {
                warn!("Daily update {} cancelled before attempt {}", run_id, attempt);
                return BatchReport::aborted(
                    run_id,
                    target_date,
                    attempt - 1,
                    AppError::Cancelled.to_string(),
                    elapsed_ms(started),
                );
            }

            let retry_error = match self.run_attempt(run_id, attempt, target_date).await {
                Ok(outcome) => match outcome.error {
                    Some(e) if e.is_retryable() && attempt < max_attempts => e,
                    _ => {
                        let report = self.report(run_id, target_date, attempt, outcome, started);
                        info!(
                            "Daily update {} finished: success={} inserted={} updated={} skipped={} failed={} in {}ms",
                            run_id,
                            report.success,
                            report.inserted,
                            report.updated,
                            report.skipped,
                            report.failed,
                            report.duration_ms
                        );
                        return report;
                    }
                },
                Err(e) if e.is_retryable() && attempt < max_attempts => e,
                Err(e) => {
                    error!("Daily update {} gave up after {} attempts: {}", run_id, attempt, e);
                    return BatchReport::aborted(
                        run_id,
                        target_date,
                        attempt,
                        e.to_string(),
                        elapsed_ms(started),
                    );
                }
            };

            let delay = backoff_delay(self.config.retry_base_delay, attempt);
            warn!(
                "Daily update {} attempt {} failed: {}. Retrying in {:?}",
                run_id, attempt, retry_error, delay
            );
            // a cancel during backoff is reported at the top of the loop
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {}
            }
            attempt += 1;
        }
    }

    /// One pass over the instrument universe.
    ///
    /// `Err` means the attempt never started dispatching.
    async fn run_attempt(&self, run_id: Uuid, attempt: u32, target_date: NaiveDate) -> Result<AttemptOutcome> {
        let started = Instant::now();
        let deadline = started + self.config.batch_timeout;

        let mut log = UpdateLog::start(run_id, attempt, target_date, &self.config.source);
        let store = Arc::clone(&self.store);
        let pending = log.clone();
        log.id = Some(tokio::task::spawn_blocking(move || store.create_update_log(&pending)).await??);

        let store = Arc::clone(&self.store);
        let instruments = match tokio::task::spawn_blocking(move || store.list_active_instruments()).await? {
            Ok(instruments) => instruments,
            Err(e) => {
                self.finish_log(log, &BatchCounters::default(), Some(e.to_string()), started)
                    .await;
                return Err(e);
            }
        };
        info!(
            "Attempt {} of run {}: {} active instruments",
            attempt,
            run_id,
            instruments.len()
        );

        let counters = Arc::new(BatchCounters::default());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks: JoinSet<(Instrument, Result<UpdateOutcome>)> = JoinSet::new();
        let mut stop: Option<AppError> = None;

        for instrument in instruments {
            if self.cancel.is_cancelled() {
                stop = Some(AppError::Cancelled);
                break;
            }
            let permit = match tokio::time::timeout_at(deadline, Arc::clone(&semaphore).acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    stop = Some(AppError::Internal("worker pool closed".to_string()));
                    break;
                }
                Err(_) => {
                    stop = Some(AppError::BatchTimeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                    break;
                }
            };
            // Waiting for a slot can span a cancel
            if self.cancel.is_cancelled() {
                stop = Some(AppError::Cancelled);
                break;
            }

            let updater = Arc::clone(&self.updater);
            let counters = Arc::clone(&counters);
            tasks.spawn(async move {
                let _permit = permit;
                let result = updater.update(instrument.id, target_date).await;
                counters.record(&result);
                (instrument, result)
            });
        }

        if stop.is_some() {
            debug!("Run {} stopped dispatching; draining {} in-flight updates", run_id, tasks.len());
        }

        let mut failures = Vec::new();
        loop {
            let next = tokio::time::timeout_at(deadline, tasks.join_next()).await;
            match next {
                Ok(Some(joined)) => collect(joined, &counters, &mut failures),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Run {} reached its deadline with {} updates in flight; abandoning them",
                        run_id,
                        tasks.len()
                    );
                    if stop.is_none() {
                        stop = Some(AppError::BatchTimeout {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    tasks.abort_all();
                    while let Some(joined) = tasks.join_next().await {
                        collect(joined, &counters, &mut failures);
                    }
                    break;
                }
            }
        }

        if stop.is_none() && Instant::now() > deadline {
            stop = Some(AppError::BatchTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }
        if stop.is_none() && counters.looks_like_storage_outage() {
            stop = Some(AppError::Persistence(format!(
                "all {} failed updates hit storage errors",
                counters.failed()
            )));
        }

        self.finish_log(log, &counters, stop.as_ref().map(|e| e.to_string()), started)
            .await;

        Ok(AttemptOutcome {
            counters,
            failures,
            error: stop,
        })
    }

    /// Finalize an attempt's log. A failure here is logged, not propagated.
    async fn finish_log(&self, mut log: UpdateLog, counters: &BatchCounters, error: Option<String>, started: Instant) {
        log.records_processed = counters.processed();
        log.records_inserted = counters.inserted();
        log.records_updated = counters.updated();
        log.records_failed = counters.failed();
        let status = if error.is_some() {
            UpdateStatus::Failed
        } else {
            UpdateStatus::Completed
        };
        log.finish(status, error, elapsed_ms(started));

        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || store.finish_update_log(&log)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to finalize update log: {}", e),
            Err(e) => error!("Failed to finalize update log: {}", e),
        }
    }

    fn report(&self, run_id: Uuid, target_date: NaiveDate, attempts: u32, outcome: AttemptOutcome, started: Instant) -> BatchReport {
        let c = &outcome.counters;
        BatchReport {
            run_id,
            target_date,
            success: outcome.error.is_none(),
            attempts,
            processed: c.processed(),
            inserted: c.inserted(),
            updated: c.updated(),
            skipped: c.skipped(),
            failed: c.failed(),
            failures: outcome.failures,
            error: outcome.error.map(|e| e.to_string()),
            duration_ms: elapsed_ms(started),
        }
    }

    /// Manually update a single instrument by symbol.
    pub async fn update_symbol(&self, symbol: &str, target_date: NaiveDate) -> Result<UpdateOutcome> {
        let store = Arc::clone(&self.store);
        let lookup = symbol.to_string();
        let instrument = tokio::task::spawn_blocking(move || store.find_instrument(&lookup))
            .await??
            .ok_or_else(|| AppError::NotFound(format!("instrument {}", symbol)))?;
        self.updater.update(instrument.id, target_date).await
    }

    /// Delete update logs older than `retention_days` before `today`.
    pub async fn cleanup_old_logs(&self, today: NaiveDate, retention_days: u32) -> Result<usize> {
        let cutoff = today - chrono::Days::new(u64::from(retention_days));
        let store = Arc::clone(&self.store);
        let removed = tokio::task::spawn_blocking(move || store.cleanup_old_logs(cutoff)).await??;
        info!("Removed {} update logs before {}", removed, cutoff);
        Ok(removed)
    }
}

/// Fold one finished worker into the failure list.
///
/// Aborted workers are not counted: they never reported a result.
fn collect(
    joined: std::result::Result<(Instrument, Result<UpdateOutcome>), JoinError>,
    counters: &BatchCounters,
    failures: &mut Vec<InstrumentFailure>,
) {
    match joined {
        Ok((_, Ok(_))) => {}
        Ok((instrument, Err(e))) if e.is_skip() => {
            debug!("Skipped {}: {}", instrument.symbol, e);
        }
        Ok((instrument, Err(e))) => {
            warn!("Update failed for {}: {}", instrument.symbol, e);
            failures.push(InstrumentFailure {
                instrument_id: Some(instrument.id),
                symbol: instrument.symbol,
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            let e = AppError::from(e);
            error!("Update task lost: {}", e);
            counters.record_lost_task();
            failures.push(InstrumentFailure {
                instrument_id: None,
                symbol: String::new(),
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
        }
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}
