use chrono::NaiveTime;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Incremental update configuration.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Trailing bars read per update. Bounds the longest moving average.
    pub lookback_bars: usize,
    /// Below this many bars an update fails with insufficient data.
    pub min_history_bars: usize,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            lookback_bars: 240,
            min_history_bars: 20,
        }
    }
}

/// Batch orchestration configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum instruments updated at once.
    pub max_concurrency: usize,
    /// Retries after the first attempt when the whole batch fails.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles on each subsequent retry.
    pub retry_base_delay: Duration,
    /// Wall-clock ceiling for one attempt.
    pub batch_timeout: Duration,
    /// Source identifier written to the update log.
    pub source: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(60),
            batch_timeout: Duration::from_secs(3600),
            source: "daily_indicators".to_string(),
        }
    }
}

/// Data retention periods in days.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Update log retention (default: 180 days).
    pub update_log_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { update_log_days: 180 }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file.
    pub database_path: String,
    pub updater: UpdaterConfig,
    pub batch: BatchConfig,
    pub retention: RetentionConfig,
    /// TTL for memoized signal lookups.
    pub cache_ttl: Duration,
    /// Local time of day the daemon runs the daily update.
    pub update_time: NaiveTime,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let updater_defaults = UpdaterConfig::default();
        let batch_defaults = BatchConfig::default();

        Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/indicators.db".to_string()),
            updater: UpdaterConfig {
                lookback_bars: parse_env("INDICATOR_LOOKBACK_BARS")
                    .unwrap_or(updater_defaults.lookback_bars),
                min_history_bars: parse_env("MIN_HISTORY_BARS")
                    .unwrap_or(updater_defaults.min_history_bars),
            },
            batch: BatchConfig {
                max_concurrency: parse_env("MAX_CONCURRENT_UPDATES")
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(batch_defaults.max_concurrency),
                max_retries: parse_env("MAX_RETRIES").unwrap_or(batch_defaults.max_retries),
                retry_base_delay: parse_env("RETRY_BASE_DELAY_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(batch_defaults.retry_base_delay),
                batch_timeout: parse_env("BATCH_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(batch_defaults.batch_timeout),
                source: env::var("UPDATE_SOURCE").unwrap_or(batch_defaults.source),
            },
            retention: RetentionConfig {
                update_log_days: parse_env("LOG_RETENTION_DAYS").unwrap_or(180),
            },
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL_SECONDS").unwrap_or(300)),
            update_time: env::var("DATA_UPDATE_TIME")
                .ok()
                .and_then(|v| NaiveTime::parse_from_str(&v, "%H:%M").ok())
                .unwrap_or(default_update_time()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "data/indicators.db".to_string(),
            updater: UpdaterConfig::default(),
            batch: BatchConfig::default(),
            retention: RetentionConfig::default(),
            cache_ttl: Duration::from_secs(300),
            update_time: default_update_time(),
        }
    }
}

/// 18:00, after the market data import has landed.
fn default_update_time() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Read and parse an environment variable, ignoring unset or malformed values.
fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
