//! Rolling support and resistance levels.

use super::{check_aligned, check_period, range_extremes};
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    /// Lowest low over the window.
    pub support: f64,
    /// Highest high over the window.
    pub resistance: f64,
}

/// Support and resistance over the trailing `window` bars.
pub fn support_resistance(highs: &[f64], lows: &[f64], window: usize) -> Result<Option<SupportResistance>> {
    check_period("Support/resistance", window)?;
    check_aligned("Support/resistance", &[highs.len(), lows.len()])?;
    if lows.len() < window {
        return Ok(None);
    }

    let start = lows.len() - window;
    let (support, resistance) = range_extremes(&highs[start..], &lows[start..]);
    Ok(Some(SupportResistance { support, resistance }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_track_trailing_window() {
        let mut highs = vec![12.0; 25];
        let mut lows = vec![8.0; 25];
        // outside the trailing 20
        highs[2] = 50.0;
        lows[3] = 1.0;
        // inside
        highs[20] = 15.0;
        lows[10] = 6.5;

        let levels = support_resistance(&highs, &lows, 20).unwrap().unwrap();
        assert_eq!(levels.resistance, 15.0);
        assert_eq!(levels.support, 6.5);
    }

    #[test]
    fn test_levels_insufficient_data() {
        assert_eq!(support_resistance(&[1.0; 19], &[1.0; 19], 20).unwrap(), None);
    }
}
