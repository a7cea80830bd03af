//! Simple Moving Average (SMA).

use super::{check_period, mean};
use crate::error::Result;

/// Arithmetic mean of the last `period` values.
///
/// Absent when fewer than `period` values are available.
pub fn sma(values: &[f64], period: usize) -> Result<Option<f64>> {
    check_period("SMA", period)?;
    if values.len() < period {
        return Ok(None);
    }
    Ok(Some(mean(&values[values.len() - period..])))
}
