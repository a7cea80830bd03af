//! Price momentum.

use super::check_period;
use crate::error::Result;

/// Percentage change of the last close against the close `period` bars earlier.
///
/// Absent when that earlier bar does not exist or its price is zero.
pub fn momentum(closes: &[f64], period: usize) -> Result<Option<f64>> {
    check_period("Momentum", period)?;
    let n = closes.len();
    if n <= period {
        return Ok(None);
    }

    let past = closes[n - 1 - period];
    if past == 0.0 {
        return Ok(None);
    }
    Ok(Some((closes[n - 1] - past) / past * 100.0))
}
