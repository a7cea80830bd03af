//! Volume indicators.

use super::sma;
use crate::error::Result;

/// Simple average of the last `period` volumes.
pub fn volume_ma(volumes: &[f64], period: usize) -> Result<Option<f64>> {
    sma(volumes, period)
}

/// Last volume relative to its `period`-bar average.
///
/// Absent when the average is absent or zero.
pub fn volume_ratio(volumes: &[f64], period: usize) -> Result<Option<f64>> {
    let Some(average) = volume_ma(volumes, period)? else {
        return Ok(None);
    };
    if average == 0.0 {
        return Ok(None);
    }
    Ok(volumes.last().map(|v| v / average))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indicators::test_support::assert_close;

    #[test]
    fn test_volume_ma() {
        let volumes = [100.0, 200.0, 300.0, 400.0, 500.0, 600.0];
        assert_close(volume_ma(&volumes, 5).unwrap().unwrap(), 400.0);
        assert_eq!(volume_ma(&volumes, 20).unwrap(), None);
    }

    #[test]
    fn test_volume_ratio() {
        let volumes = [100.0, 100.0, 100.0, 100.0, 600.0];
        assert_close(volume_ratio(&volumes, 5).unwrap().unwrap(), 600.0 / 200.0);
    }

    #[test]
    fn test_volume_ratio_zero_average() {
        assert_eq!(volume_ratio(&[0.0; 5], 5).unwrap(), None);
    }
}
