//! Williams %R.

use super::{check_aligned, check_period, range_extremes};
use crate::error::Result;

/// Williams %R over the last `period` bars, in [-100, 0].
///
/// `-100 * (highest high - close) / (highest high - lowest low)`.
/// Absent on a flat range.
pub fn williams_r(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Result<Option<f64>> {
    check_period("Williams %R", period)?;
    check_aligned("Williams %R", &[highs.len(), lows.len(), closes.len()])?;
    let n = closes.len();
    if n < period {
        return Ok(None);
    }

    let (lowest_low, highest_high) = range_extremes(&highs[n - period..], &lows[n - period..]);
    let range = highest_high - lowest_low;
    if range <= 0.0 {
        return Ok(None);
    }
    Ok(Some(-100.0 * (highest_high - closes[n - 1]) / range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_support::assert_close;

    #[test]
    fn test_williams_r_bounds() {
        let highs = vec![10.0; 14];
        let lows = vec![0.0; 14];
        let mut closes = vec![5.0; 14];
        assert_close(williams_r(&highs, &lows, &closes, 14).unwrap().unwrap(), -50.0);

        closes[13] = 10.0;
        assert_close(williams_r(&highs, &lows, &closes, 14).unwrap().unwrap(), 0.0);

        closes[13] = 0.0;
        assert_close(williams_r(&highs, &lows, &closes, 14).unwrap().unwrap(), -100.0);
    }

    #[test]
    fn test_williams_r_flat_and_short() {
        let flat = vec![3.0; 14];
        assert_eq!(williams_r(&flat, &flat, &flat, 14).unwrap(), None);
        assert_eq!(williams_r(&flat[..5], &flat[..5], &flat[..5], 14).unwrap(), None);
    }
}
