//! Validated, date-ordered OHLCV history for one instrument.

use crate::error::{AppError, Result};
use crate::types::{Bar, InstrumentId, RawBar};
use chrono::NaiveDate;

/// Immutable daily bar history, sorted by trade date with one bar per date.
///
/// Every accessor returns an owned copy, so callers never hold a handle
/// into the buffer itself. Narrowing the history produces a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuffer {
    instrument_id: InstrumentId,
    bars: Vec<Bar>,
}

impl SeriesBuffer {
    /// Build a buffer from raw records in any order.
    ///
    /// Fails with a validation error on a missing field, a non-positive or
    /// non-finite price, a negative volume, or two records for the same date.
    pub fn new(instrument_id: InstrumentId, raw: Vec<RawBar>) -> Result<Self> {
        let mut bars = raw
            .into_iter()
            .map(|r| validate(instrument_id, r))
            .collect::<Result<Vec<_>>>()?;
        bars.sort_by_key(|b| b.trade_date);

        if let Some(pair) = bars.windows(2).find(|w| w[0].trade_date == w[1].trade_date) {
            return Err(AppError::Validation(format!(
                "instrument {}: duplicate bar for {}",
                instrument_id, pair[0].trade_date
            )));
        }

        Ok(Self { instrument_id, bars })
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> Vec<Bar> {
        self.bars.clone()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.trade_date).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Volumes as floats, ready for averaging.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.trade_date)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.bars
            .binary_search_by_key(&date, |b| b.trade_date)
            .is_ok()
    }

    /// Bars on or before `date`, keeping at most the trailing `max_bars`.
    pub fn slice_ending(&self, date: NaiveDate, max_bars: usize) -> SeriesBuffer {
        let end = self.bars.partition_point(|b| b.trade_date <= date);
        let start = end.saturating_sub(max_bars);
        SeriesBuffer {
            instrument_id: self.instrument_id,
            bars: self.bars[start..end].to_vec(),
        }
    }
}

fn validate(instrument_id: InstrumentId, raw: RawBar) -> Result<Bar> {
    let date = raw.trade_date;
    let price = |name: &str, value: Option<f64>| -> Result<f64> {
        match value {
            None => Err(AppError::Validation(format!(
                "instrument {}: bar {} is missing {}",
                instrument_id, date, name
            ))),
            Some(v) if !v.is_finite() || v <= 0.0 => Err(AppError::Validation(format!(
                "instrument {}: bar {} has invalid {} {}",
                instrument_id, date, name, v
            ))),
            Some(v) => Ok(v),
        }
    };

    let open = price("open", raw.open)?;
    let high = price("high", raw.high)?;
    let low = price("low", raw.low)?;
    let close = price("close", raw.close)?;
    let volume = match raw.volume {
        None => {
            return Err(AppError::Validation(format!(
                "instrument {}: bar {} is missing volume",
                instrument_id, date
            )))
        }
        Some(v) => u64::try_from(v).map_err(|_| {
            AppError::Validation(format!(
                "instrument {}: bar {} has negative volume {}",
                instrument_id, date, v
            ))
        })?,
    };

    Ok(Bar {
        trade_date: date,
        open,
        high,
        low,
        close,
        volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> RawBar {
        RawBar::new(day(d), close, close + 1.0, close - 1.0, close, 1_000)
    }

    #[test]
    fn test_sorts_input() {
        let buffer = SeriesBuffer::new(1, vec![bar(3, 12.0), bar(1, 10.0), bar(2, 11.0)]).unwrap();
        assert_eq!(buffer.dates(), vec![day(1), day(2), day(3)]);
        assert_eq!(buffer.closes(), vec![10.0, 11.0, 12.0]);
        assert_eq!(buffer.last_close(), Some(12.0));
    }

    #[test]
    fn test_rejects_missing_field() {
        let mut raw = bar(1, 10.0);
        raw.close = None;
        let err = SeriesBuffer::new(1, vec![raw]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let mut raw = bar(1, 10.0);
        raw.low = Some(0.0);
        assert!(matches!(
            SeriesBuffer::new(1, vec![raw]),
            Err(AppError::Validation(_))
        ));

        let mut raw = bar(1, 10.0);
        raw.open = Some(f64::NAN);
        assert!(SeriesBuffer::new(1, vec![raw]).is_err());
    }

    #[test]
    fn test_rejects_negative_volume() {
        let mut raw = bar(2, 10.0);
        raw.volume = Some(-5);
        let err = SeriesBuffer::new(9, vec![bar(1, 10.0), raw]).unwrap_err();
        assert!(err.to_string().contains("negative volume"));
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        let err = SeriesBuffer::new(1, vec![bar(1, 10.0), bar(1, 11.0)]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_zero_volume_is_valid() {
        let mut raw = bar(1, 10.0);
        raw.volume = Some(0);
        let buffer = SeriesBuffer::new(1, vec![raw]).unwrap();
        assert_eq!(buffer.volumes(), vec![0.0]);
    }

    #[test]
    fn test_slice_ending() {
        let raw = (1..=10).map(|d| bar(d, d as f64 * 10.0)).collect();
        let buffer = SeriesBuffer::new(1, raw).unwrap();

        let slice = buffer.slice_ending(day(7), 3);
        assert_eq!(slice.dates(), vec![day(5), day(6), day(7)]);

        let slice = buffer.slice_ending(day(2), 5);
        assert_eq!(slice.len(), 2);

        let slice = buffer.slice_ending(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(), 5);
        assert!(slice.is_empty());

        // the source is untouched
        assert_eq!(buffer.len(), 10);
        assert!(buffer.contains_date(day(10)));
        assert!(!buffer.contains_date(day(11)));
    }
}
