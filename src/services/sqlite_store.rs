//! SQLite persistence for bars, indicator rows and update logs.
//!
//! Tables:
//! - `instruments`: the tradable universe and its active flag
//! - `daily_prices`: raw OHLCV as ingested, unvalidated
//! - `technical_indicators`: one row per (instrument, trade date)
//! - `data_update_logs`: one row per batch attempt

use super::store::IndicatorStore;
use crate::error::{AppError, Result};
use crate::types::{
    IndicatorRow, Instrument, InstrumentId, RawBar, UpdateLog, UpdateStatus, UpsertOutcome,
    INDICATOR_COLUMNS, INDICATOR_FIELD_COUNT,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// SQLite store implementing [`IndicatorStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    upsert_sql: String,
    select_sql: String,
    select_one_sql: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Persistence(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self::with_connection(conn)?;
        info!("SQLite store opened at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let store = Self::with_connection(Connection::open_in_memory()?)?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            upsert_sql: upsert_sql(),
            select_sql: select_sql(),
            select_one_sql: format!("{} WHERE instrument_id = ?1 AND trade_date = ?2", select_sql()),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Persistence("connection mutex poisoned".to_string()))
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS instruments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT UNIQUE NOT NULL,
                name TEXT,
                is_active INTEGER NOT NULL DEFAULT 1
            )",
            [],
        )?;

        // Prices stay nullable: validation happens when a series is built
        conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_prices (
                instrument_id INTEGER NOT NULL REFERENCES instruments(id),
                trade_date TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume INTEGER,
                PRIMARY KEY (instrument_id, trade_date)
            )",
            [],
        )?;

        let indicator_columns = INDICATOR_COLUMNS
            .iter()
            .map(|c| format!("{} REAL", c))
            .collect::<Vec<_>>()
            .join(",\n                ");
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS technical_indicators (
                instrument_id INTEGER NOT NULL REFERENCES instruments(id),
                trade_date TEXT NOT NULL,
                {},
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (instrument_id, trade_date)
            )",
                indicator_columns
            ),
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS data_update_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                attempt INTEGER NOT NULL,
                update_date TEXT NOT NULL,
                data_source TEXT NOT NULL,
                records_processed INTEGER NOT NULL DEFAULT 0,
                records_inserted INTEGER NOT NULL DEFAULT 0,
                records_updated INTEGER NOT NULL DEFAULT 0,
                records_failed INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                error_message TEXT,
                execution_time_ms INTEGER,
                created_at INTEGER NOT NULL,
                completed_at INTEGER
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_update_logs_date ON data_update_logs(update_date)",
            [],
        )?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    // ========== Instruments ==========

    /// Look up an instrument by symbol, creating it as active if unknown.
    pub fn get_or_create_instrument(&self, symbol: &str, name: Option<&str>) -> Result<Instrument> {
        let conn = self.conn()?;
        let symbol = normalize_symbol(symbol);
        conn.execute(
            "INSERT INTO instruments (symbol, name) VALUES (?1, ?2)
             ON CONFLICT(symbol) DO UPDATE SET name = COALESCE(excluded.name, name)",
            params![symbol, name],
        )?;
        let instrument = conn.query_row(
            "SELECT id, symbol, name, is_active FROM instruments WHERE symbol = ?1",
            params![symbol],
            map_instrument,
        )?;
        Ok(instrument)
    }

    /// Include or exclude an instrument from the daily batch.
    pub fn set_instrument_active(&self, instrument_id: InstrumentId, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE instruments SET is_active = ?1 WHERE id = ?2",
            params![active, instrument_id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("instrument {}", instrument_id)));
        }
        Ok(())
    }

    // ========== Bars ==========

    /// Store ingested bars as-is, replacing any bar already stored for the same date.
    pub fn insert_bars(&self, instrument_id: InstrumentId, bars: &[RawBar]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO daily_prices (instrument_id, trade_date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(instrument_id, trade_date) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume",
            )?;
            for bar in bars {
                stmt.execute(params![
                    instrument_id,
                    bar.trade_date,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Stored {} bars for instrument {}", bars.len(), instrument_id);
        Ok(bars.len())
    }

    // ========== Indicators ==========

    /// Number of stored indicator rows for an instrument.
    pub fn indicator_row_count(&self, instrument_id: InstrumentId) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM technical_indicators WHERE instrument_id = ?1",
            params![instrument_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Last write time of a stored indicator row, in epoch milliseconds.
    pub fn indicator_updated_at(&self, instrument_id: InstrumentId, trade_date: NaiveDate) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let updated_at = conn
            .query_row(
                "SELECT updated_at FROM technical_indicators WHERE instrument_id = ?1 AND trade_date = ?2",
                params![instrument_id, trade_date],
                |r| r.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }

    fn upsert_on(&self, conn: &Connection, row: &IndicatorRow) -> Result<UpsertOutcome> {
        let stored = conn
            .prepare_cached(&self.select_one_sql)?
            .query_row(params![row.instrument_id, row.trade_date], map_indicator_row)
            .optional()?;

        let (merged, outcome) = match stored {
            Some(stored) => {
                let mut merged = stored.clone();
                merged.merge_from(row);
                if merged == stored {
                    // identical recompute leaves the row and its timestamp alone
                    return Ok(UpsertOutcome::Updated);
                }
                (merged, UpsertOutcome::Updated)
            }
            None => (row.clone(), UpsertOutcome::Inserted),
        };

        let values = merged.values();
        let now = chrono::Utc::now().timestamp_millis();
        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(INDICATOR_FIELD_COUNT + 3);
        bound.push(&merged.instrument_id);
        bound.push(&merged.trade_date);
        bound.extend(values.iter().map(|v| v as &dyn ToSql));
        bound.push(&now);

        conn.prepare_cached(&self.upsert_sql)?
            .execute(bound.as_slice())?;

        Ok(outcome)
    }

    // ========== Update logs ==========

    /// Most recent update logs, newest first.
    pub fn recent_update_logs(&self, limit: usize) -> Result<Vec<UpdateLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, run_id, attempt, update_date, data_source, records_processed,
                    records_inserted, records_updated, records_failed, status,
                    error_message, execution_time_ms, created_at, completed_at
             FROM data_update_logs
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let logs = stmt
            .query_map(params![limit as i64], |row| {
                let run_id: String = row.get(1)?;
                let status: String = row.get(9)?;
                Ok(UpdateLog {
                    id: row.get(0)?,
                    run_id: Uuid::parse_str(&run_id).unwrap_or_default(),
                    attempt: row.get(2)?,
                    update_date: row.get(3)?,
                    data_source: row.get(4)?,
                    records_processed: row.get(5)?,
                    records_inserted: row.get(6)?,
                    records_updated: row.get(7)?,
                    records_failed: row.get(8)?,
                    status: UpdateStatus::parse(&status),
                    error_message: row.get(10)?,
                    execution_time_ms: row.get(11)?,
                    created_at: row.get(12)?,
                    completed_at: row.get(13)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}

impl IndicatorStore for SqliteStore {
    fn list_active_instruments(&self) -> Result<Vec<Instrument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, symbol, name, is_active FROM instruments WHERE is_active = 1 ORDER BY id",
        )?;
        let instruments = stmt
            .query_map([], map_instrument)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(instruments)
    }

    fn find_instrument(&self, symbol: &str) -> Result<Option<Instrument>> {
        let conn = self.conn()?;
        let instrument = conn
            .query_row(
                "SELECT id, symbol, name, is_active FROM instruments WHERE symbol = ?1",
                params![normalize_symbol(symbol)],
                map_instrument,
            )
            .optional()?;
        Ok(instrument)
    }

    fn read_bars(&self, instrument_id: InstrumentId, end_date: NaiveDate, max_count: usize) -> Result<Vec<RawBar>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT trade_date, open, high, low, close, volume
             FROM daily_prices
             WHERE instrument_id = ?1 AND trade_date <= ?2
             ORDER BY trade_date DESC
             LIMIT ?3",
        )?;
        let mut bars = stmt
            .query_map(params![instrument_id, end_date, max_count as i64], |row| {
                Ok(RawBar {
                    trade_date: row.get(0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        bars.reverse();
        Ok(bars)
    }

    fn upsert_indicator_row(&self, row: &IndicatorRow) -> Result<UpsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let outcome = self.upsert_on(&tx, row)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn upsert_indicator_rows(&self, rows: &[IndicatorRow]) -> Result<Vec<UpsertOutcome>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let outcomes = rows
            .iter()
            .map(|row| self.upsert_on(&tx, row))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(outcomes)
    }

    fn read_indicator_row(&self, instrument_id: InstrumentId, trade_date: NaiveDate) -> Result<Option<IndicatorRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(&self.select_one_sql, params![instrument_id, trade_date], map_indicator_row)
            .optional()?;
        Ok(row)
    }

    fn read_latest_indicator_row(&self, instrument_id: InstrumentId) -> Result<Option<IndicatorRow>> {
        let conn = self.conn()?;
        let sql = format!(
            "{} WHERE instrument_id = ?1 ORDER BY trade_date DESC LIMIT 1",
            self.select_sql
        );
        let row = conn
            .query_row(&sql, params![instrument_id], map_indicator_row)
            .optional()?;
        Ok(row)
    }

    fn create_update_log(&self, log: &UpdateLog) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO data_update_logs
                (run_id, attempt, update_date, data_source, records_processed, records_inserted,
                 records_updated, records_failed, status, error_message, execution_time_ms,
                 created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                log.run_id.to_string(),
                log.attempt,
                log.update_date,
                log.data_source,
                log.records_processed,
                log.records_inserted,
                log.records_updated,
                log.records_failed,
                log.status.as_str(),
                log.error_message,
                log.execution_time_ms,
                log.created_at,
                log.completed_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_update_log(&self, log: &UpdateLog) -> Result<()> {
        let id = log
            .id
            .ok_or_else(|| AppError::Internal("update log has no id".to_string()))?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE data_update_logs SET
                records_processed = ?1,
                records_inserted = ?2,
                records_updated = ?3,
                records_failed = ?4,
                status = ?5,
                error_message = ?6,
                execution_time_ms = ?7,
                completed_at = ?8
             WHERE id = ?9",
            params![
                log.records_processed,
                log.records_inserted,
                log.records_updated,
                log.records_failed,
                log.status.as_str(),
                log.error_message,
                log.execution_time_ms,
                log.completed_at,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("update log {}", id)));
        }
        Ok(())
    }

    fn cleanup_old_logs(&self, before: NaiveDate) -> Result<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM data_update_logs WHERE update_date < ?1",
            params![before],
        )?;
        if count > 0 {
            info!("Cleaned up {} update logs older than {}", count, before);
        }
        Ok(count)
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn map_instrument(row: &rusqlite::Row<'_>) -> rusqlite::Result<Instrument> {
    Ok(Instrument {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        is_active: row.get(3)?,
    })
}

fn map_indicator_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndicatorRow> {
    let mut values = [None; INDICATOR_FIELD_COUNT];
    for (i, slot) in values.iter_mut().enumerate() {
        *slot = row.get(i + 2)?;
    }
    Ok(IndicatorRow::from_values(row.get(0)?, row.get(1)?, values))
}

/// Insert a row, or overwrite every column with an already merged row.
fn upsert_sql() -> String {
    let columns = INDICATOR_COLUMNS.join(", ");
    let placeholders = (3..=INDICATOR_FIELD_COUNT + 3)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let assignments = INDICATOR_COLUMNS
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(",\n                ");
    format!(
        "INSERT INTO technical_indicators (instrument_id, trade_date, {columns}, updated_at)
         VALUES (?1, ?2, {placeholders})
         ON CONFLICT(instrument_id, trade_date) DO UPDATE SET
                {assignments},
                updated_at = excluded.updated_at"
    )
}

fn select_sql() -> String {
    format!(
        "SELECT instrument_id, trade_date, {} FROM technical_indicators",
        INDICATOR_COLUMNS.join(", ")
    )
}
