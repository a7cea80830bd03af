//! Stochastic Oscillator (KD).

use super::{check_aligned, check_period, mean, range_extremes};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// %K/%D pair as of the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

/// Slow stochastic oscillator.
///
/// Raw %K = 100 * (close - lowest low) / (highest high - lowest low) over
/// `k_period` bars. The reported %K is the `smoothing`-bar average of raw %K
/// and %D is the `smoothing`-bar average of that, so one period drives both
/// smoothing steps. Needs `k_period + 2 * (smoothing - 1)` bars.
///
/// A flat high/low range anywhere in the required window yields `None`.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    smoothing: usize,
) -> Result<Option<StochasticValue>> {
    check_period("Stochastic %K", k_period)?;
    check_period("Stochastic smoothing", smoothing)?;
    check_aligned("Stochastic", &[highs.len(), lows.len(), closes.len()])?;

    let n = closes.len();
    if n < k_period + 2 * (smoothing - 1) {
        return Ok(None);
    }

    let raw_count = 2 * smoothing - 1;
    let mut raw_k = Vec::with_capacity(raw_count);
    for end in (n - raw_count)..n {
        let start = end + 1 - k_period;
        let (lowest_low, highest_high) = range_extremes(&highs[start..=end], &lows[start..=end]);
        let range = highest_high - lowest_low;
        if range <= 0.0 {
            return Ok(None);
        }
        raw_k.push(100.0 * (closes[end] - lowest_low) / range);
    }

    let slow_k: Vec<f64> = raw_k.windows(smoothing).map(mean).collect();
    let Some(&k) = slow_k.last() else {
        return Ok(None);
    };

    Ok(Some(StochasticValue {
        k,
        d: mean(&slow_k),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_support::{assert_close, rising};

    fn uptrend(count: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let base = rising(count, 100.0, 1.5);
        let highs = base.iter().map(|b| b + 2.0).collect();
        let lows = base.iter().map(|b| b - 1.0).collect();
        let closes = base.iter().map(|b| b + 1.0).collect();
        (highs, lows, closes)
    }

    #[test]
    fn test_stochastic_insufficient_data() {
        let (h, l, c) = uptrend(17);
        assert_eq!(stochastic(&h, &l, &c, 14, 3).unwrap(), None);
        let (h, l, c) = uptrend(18);
        assert!(stochastic(&h, &l, &c, 14, 3).unwrap().is_some());
    }

    #[test]
    fn test_stochastic_uptrend_high_k() {
        let (h, l, c) = uptrend(30);
        let value = stochastic(&h, &l, &c, 14, 3).unwrap().unwrap();
        assert!(value.k > 50.0, "%K in uptrend should be > 50, got {}", value.k);
        assert!((0.0..=100.0).contains(&value.d));
    }

    #[test]
    fn test_stochastic_close_at_high() {
        let highs = rising(20, 10.0, 1.0);
        let lows: Vec<f64> = highs.iter().map(|h| h - 3.0).collect();
        let value = stochastic(&highs, &lows, &highs, 14, 3).unwrap().unwrap();
        assert_close(value.k, 100.0);
        assert_close(value.d, 100.0);
    }

    #[test]
    fn test_stochastic_smoothing_averages() {
        // range fixed to [0, 10]; raw %K follows the close
        let highs = vec![10.0; 18];
        let lows = vec![0.0; 18];
        let mut closes = vec![5.0; 18];
        for (i, close) in [2.0, 4.0, 6.0, 8.0, 10.0].iter().enumerate() {
            closes[13 + i] = *close;
        }
        // raw %K = 20, 40, 60, 80, 100 -> slow %K = 40, 60, 80 -> %D = 60
        let value = stochastic(&highs, &lows, &closes, 14, 3).unwrap().unwrap();
        assert_close(value.k, 80.0);
        assert_close(value.d, 60.0);
    }

    #[test]
    fn test_stochastic_flat_range_is_absent() {
        let flat = vec![10.0; 20];
        assert_eq!(stochastic(&flat, &flat, &flat, 14, 3).unwrap(), None);
    }

    #[test]
    fn test_stochastic_rejects_mismatched_inputs() {
        let (h, l, c) = uptrend(20);
        assert!(stochastic(&h[..19], &l, &c, 14, 3).is_err());
    }
}
