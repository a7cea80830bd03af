//! Exponential Moving Average (EMA).

use super::{check_period, mean};
use crate::error::Result;

/// EMA series with smoothing factor `2 / (period + 1)`.
///
/// The first value is the simple average of the first `period` inputs and
/// sits at input index `period - 1`; each later input extends the series by
/// one. Empty when fewer than `period` values are available.
pub fn ema_series(values: &[f64], period: usize) -> Result<Vec<f64>> {
    check_period("EMA", period)?;
    if values.len() < period {
        return Ok(Vec::new());
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len() - period + 1);

    // First EMA is SMA
    let mut ema = mean(&values[..period]);
    series.push(ema);

    for value in &values[period..] {
        ema = (value - ema) * multiplier + ema;
        series.push(ema);
    }

    Ok(series)
}

/// EMA as of the last value.
pub fn ema(values: &[f64], period: usize) -> Result<Option<f64>> {
    Ok(ema_series(values, period)?.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_support::{assert_close, rising};

    #[test]
    fn test_ema_insufficient_data() {
        assert_eq!(ema(&rising(11, 10.0, 1.0), 12).unwrap(), None);
        assert!(ema_series(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_ema_seeded_by_simple_average() {
        let values = rising(12, 10.0, 1.0);
        assert_close(ema(&values, 12).unwrap().unwrap(), 15.5);
    }

    #[test]
    fn test_ema_recurrence() {
        // seed = 2.0, multiplier = 0.5
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let series = ema_series(&values, 3).unwrap();
        assert_eq!(series.len(), 3);
        assert_close(series[0], 2.0);
        assert_close(series[1], 3.0);
        assert_close(series[2], 4.0);
    }

    #[test]
    fn test_ema_constant_series() {
        let values = vec![42.0; 40];
        assert_close(ema(&values, 26).unwrap().unwrap(), 42.0);
    }

    #[test]
    fn test_ema_zero_period_is_an_error() {
        assert!(ema(&[1.0], 0).is_err());
    }
}
