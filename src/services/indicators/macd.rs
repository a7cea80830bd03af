//! MACD (Moving Average Convergence Divergence).

use super::{check_period, ema_series};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// MACD triple as of the last close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    /// EMA(fast) - EMA(slow).
    pub macd: f64,
    /// EMA(signal) of the MACD line.
    pub signal: f64,
    /// MACD line minus signal line.
    pub histogram: f64,
}

/// MACD for the given fast, slow and signal periods.
///
/// Both EMAs are seeded by their own simple average and aligned on the
/// slow EMA's first value. Absent until `slow + signal` closes exist.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Result<Option<MacdValue>> {
    check_period("MACD fast", fast)?;
    check_period("MACD slow", slow)?;
    check_period("MACD signal", signal)?;
    if fast >= slow {
        return Err(AppError::Computation(format!(
            "MACD fast period {} must be shorter than slow period {}",
            fast, slow
        )));
    }

    if closes.len() < slow + signal {
        return Ok(None);
    }

    let fast_ema = ema_series(closes, fast)?;
    let slow_ema = ema_series(closes, slow)?;

    // fast starts earlier; skip its head so both series end on the same close
    let offset = slow - fast;
    let macd_line: Vec<f64> = fast_ema[offset..]
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema_series(&macd_line, signal)?;

    let (Some(&macd), Some(&signal)) = (macd_line.last(), signal_line.last()) else {
        return Ok(None);
    };

    Ok(Some(MacdValue {
        macd,
        signal,
        histogram: macd - signal,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::ema;
    use crate::services::indicators::test_support::{assert_close, rising, zigzag};

    #[test]
    fn test_macd_needs_slow_plus_signal() {
        assert_eq!(macd(&rising(34, 100.0, 1.0), 12, 26, 9).unwrap(), None);
        assert!(macd(&rising(35, 100.0, 1.0), 12, 26, 9).unwrap().is_some());
    }

    #[test]
    fn test_macd_line_is_ema_difference() {
        let closes = zigzag(60);
        let value = macd(&closes, 12, 26, 9).unwrap().unwrap();
        let expected = ema(&closes, 12).unwrap().unwrap() - ema(&closes, 26).unwrap().unwrap();
        assert_close(value.macd, expected);
        assert_close(value.histogram, value.macd - value.signal);
    }

    #[test]
    fn test_macd_constant_series_is_zero() {
        let value = macd(&vec![25.0; 50], 12, 26, 9).unwrap().unwrap();
        assert_close(value.macd, 0.0);
        assert_close(value.signal, 0.0);
        assert_close(value.histogram, 0.0);
    }

    #[test]
    fn test_macd_uptrend_is_positive() {
        let value = macd(&rising(60, 100.0, 1.5), 12, 26, 9).unwrap().unwrap();
        assert!(value.macd > 0.0);
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert!(macd(&rising(60, 1.0, 1.0), 26, 12, 9).is_err());
        assert!(macd(&rising(60, 1.0, 1.0), 12, 26, 0).is_err());
    }
}
