//! Bollinger Bands.

use super::{check_period, mean};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Band triple as of the last close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands over the last `period` closes.
///
/// - Middle band: SMA(period)
/// - Upper band: middle + width * population standard deviation
/// - Lower band: middle - width * population standard deviation
pub fn bollinger(closes: &[f64], period: usize, width: f64) -> Result<Option<Bands>> {
    check_period("Bollinger", period)?;
    if !width.is_finite() || width < 0.0 {
        return Err(AppError::Computation(format!(
            "Bollinger width must be a non-negative number, got {}",
            width
        )));
    }
    if closes.len() < period {
        return Ok(None);
    }

    let window = &closes[closes.len() - period..];
    let middle = mean(window);
    let variance = window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / period as f64;
    let offset = width * variance.sqrt();

    Ok(Some(Bands {
        upper: middle + offset,
        middle,
        lower: middle - offset,
    }))
}
