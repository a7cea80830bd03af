//! Technical indicator implementations.
//!
//! Every function computes the indicator value as of the *last* element of
//! its input. Too little history yields `Ok(None)`; only malformed arguments
//! (a zero period, mismatched sequence lengths) return a computation error.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod support_resistance;
pub mod volume;
pub mod williams;

pub use bollinger::{bollinger, Bands};
pub use ema::{ema, ema_series};
pub use macd::{macd, MacdValue};
pub use momentum::momentum;
pub use rsi::rsi;
pub use sma::sma;
pub use stochastic::{stochastic, StochasticValue};
pub use support_resistance::{support_resistance, SupportResistance};
pub use volume::{volume_ma, volume_ratio};
pub use williams::williams_r;

use crate::error::{AppError, Result};

/// Reject a zero period.
pub(crate) fn check_period(indicator: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(AppError::Computation(format!(
            "{} period must be positive",
            indicator
        )));
    }
    Ok(())
}

/// Reject high/low/close sequences of different lengths.
pub(crate) fn check_aligned(indicator: &str, lengths: &[usize]) -> Result<()> {
    if lengths.windows(2).any(|w| w[0] != w[1]) {
        return Err(AppError::Computation(format!(
            "{} inputs have mismatched lengths {:?}",
            indicator, lengths
        )));
    }
    Ok(())
}

/// Arithmetic mean. Callers guarantee a non-empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Lowest low and highest high over a window.
pub(crate) fn range_extremes(highs: &[f64], lows: &[f64]) -> (f64, f64) {
    let lowest = lows.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lowest, highest)
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Closes rising by `step` from `start`.
    pub fn rising(count: usize, start: f64, step: f64) -> Vec<f64> {
        (0..count).map(|i| start + i as f64 * step).collect()
    }

    /// A noisy but deterministic series for bound checks.
    pub fn zigzag(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 + ((i * 7) % 11) as f64 - ((i * 3) % 5) as f64 * 1.7)
            .collect()
    }

    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }
}
