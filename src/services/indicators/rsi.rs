//! Relative Strength Index (RSI) with Wilder's smoothing.

use super::check_period;
use crate::error::Result;

/// RSI as of the last close.
///
/// Average gain and loss are seeded with the plain average of the first
/// `period` changes, then smoothed as `avg = (avg * (period - 1) + x) / period`
/// over every later change. Needs `period + 1` closes. A perfectly flat
/// series has no gains or losses and reads 0.
pub fn rsi(closes: &[f64], period: usize) -> Result<Option<f64>> {
    check_period("RSI", period)?;
    if closes.len() < period + 1 {
        return Ok(None);
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;

    let (gain_sum, loss_sum) = changes[..period]
        .iter()
        .fold((0.0, 0.0), |(g, l), &c| (g + c.max(0.0), l + (-c).max(0.0)));
    let mut avg_gain = gain_sum / p;
    let mut avg_loss = loss_sum / p;

    for &change in &changes[period..] {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
    }

    let total = avg_gain + avg_loss;
    if total == 0.0 {
        return Ok(Some(0.0));
    }
    Ok(Some(100.0 * avg_gain / total))
}
