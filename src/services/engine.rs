//! Indicator row computation and signal classification.

use super::indicators::{
    bollinger, ema, macd, momentum, rsi, sma, stochastic, support_resistance, volume_ma,
    volume_ratio, williams_r,
};
use super::series::SeriesBuffer;
use crate::error::{AppError, Result};
use crate::types::{names, IndicatorRow, SignalSet};
use chrono::NaiveDate;
use std::ops::RangeInclusive;

/// Window lengths used for every indicator in a row.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    /// Periods of `ma_5` .. `ma_240`, in column order.
    pub ma_periods: [usize; 6],
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_k_period: usize,
    pub stoch_smoothing: usize,
    pub bb_period: usize,
    pub bb_width: f64,
    pub volume_short: usize,
    pub volume_long: usize,
    pub sr_window: usize,
    pub momentum_period: usize,
    pub williams_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_periods: [5, 10, 20, 60, 120, 240],
            ema_fast: 12,
            ema_slow: 26,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_k_period: 14,
            stoch_smoothing: 3,
            bb_period: 20,
            bb_width: 2.0,
            volume_short: 5,
            volume_long: 20,
            sr_window: 20,
            momentum_period: 10,
            williams_period: 14,
        }
    }
}

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const KD_OVERSOLD: f64 = 20.0;
const KD_OVERBOUGHT: f64 = 80.0;

/// Computes indicator rows from a series and classifies them into signals.
///
/// Stateless apart from its parameters; one instance is shared by every
/// worker in a batch.
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Every indicator as of the last bar of `buffer`.
    pub fn compute_latest(&self, buffer: &SeriesBuffer) -> Result<IndicatorRow> {
        let trade_date = buffer.last_date().ok_or_else(|| {
            AppError::Computation(format!(
                "instrument {}: cannot compute indicators over an empty series",
                buffer.instrument_id()
            ))
        })?;

        let p = &self.params;
        let closes = buffer.closes();
        let highs = buffer.highs();
        let lows = buffer.lows();
        let volumes = buffer.volumes();

        let mut row = IndicatorRow::empty(buffer.instrument_id(), trade_date);

        let [p5, p10, p20, p60, p120, p240] = p.ma_periods;
        row.ma_5 = sma(&closes, p5)?;
        row.ma_10 = sma(&closes, p10)?;
        row.ma_20 = sma(&closes, p20)?;
        row.ma_60 = sma(&closes, p60)?;
        row.ma_120 = sma(&closes, p120)?;
        row.ma_240 = sma(&closes, p240)?;
        row.ema_12 = ema(&closes, p.ema_fast)?;
        row.ema_26 = ema(&closes, p.ema_slow)?;

        row.rsi_14 = rsi(&closes, p.rsi_period)?;
        if let Some(m) = macd(&closes, p.macd_fast, p.macd_slow, p.macd_signal)? {
            row.macd = Some(m.macd);
            row.macd_signal = Some(m.signal);
            row.macd_histogram = Some(m.histogram);
        }
        if let Some(s) = stochastic(&highs, &lows, &closes, p.stoch_k_period, p.stoch_smoothing)? {
            row.k_value = Some(s.k);
            row.d_value = Some(s.d);
        }

        if let Some(b) = bollinger(&closes, p.bb_period, p.bb_width)? {
            row.bb_upper = Some(b.upper);
            row.bb_middle = Some(b.middle);
            row.bb_lower = Some(b.lower);
        }

        row.volume_ma_5 = volume_ma(&volumes, p.volume_short)?;
        row.volume_ma_20 = volume_ma(&volumes, p.volume_long)?;
        row.volume_ratio = volume_ratio(&volumes, p.volume_short)?;

        if let Some(levels) = support_resistance(&highs, &lows, p.sr_window)? {
            row.support_level = Some(levels.support);
            row.resistance_level = Some(levels.resistance);
        }
        row.price_momentum = momentum(&closes, p.momentum_period)?;
        row.williams_r = williams_r(&highs, &lows, &closes, p.williams_period)?;

        Ok(row)
    }

    /// Indicators as of `date`, ignoring any later bars.
    ///
    /// Fails with `NotFound` when the series has no bar on `date`.
    pub fn compute_for_date(&self, buffer: &SeriesBuffer, date: NaiveDate) -> Result<IndicatorRow> {
        if !buffer.contains_date(date) {
            return Err(AppError::NotFound(format!(
                "instrument {}: no bar on {}",
                buffer.instrument_id(),
                date
            )));
        }
        self.compute_latest(&buffer.slice_ending(date, buffer.len()))
    }

    /// One row per trade date in `range`, each computed over at most
    /// `lookback` trailing bars, the same window a daily update reads.
    pub fn compute_history(
        &self,
        buffer: &SeriesBuffer,
        range: RangeInclusive<NaiveDate>,
        lookback: usize,
    ) -> Result<Vec<IndicatorRow>> {
        buffer
            .dates()
            .into_iter()
            .filter(|d| range.contains(d))
            .map(|d| self.compute_latest(&buffer.slice_ending(d, lookback)))
            .collect()
    }

    /// Classify a row into buy, sell and neutral signals.
    ///
    /// A rule whose inputs are absent contributes nothing.
    pub fn latest_signals(&self, row: &IndicatorRow, last_close: f64) -> SignalSet {
        let mut buy = Vec::new();
        let mut sell = Vec::new();
        let mut neutral = Vec::new();

        if let Some(r) = row.rsi_14 {
            if r < RSI_OVERSOLD {
                buy.push(names::RSI_OVERSOLD);
            } else if r > RSI_OVERBOUGHT {
                sell.push(names::RSI_OVERBOUGHT);
            } else {
                neutral.push(names::RSI_NEUTRAL);
            }
        }

        if let (Some(m), Some(s)) = (row.macd, row.macd_signal) {
            if m > s {
                buy.push(names::MACD_BULLISH_CROSS);
            } else {
                sell.push(names::MACD_BEARISH_CROSS);
            }
        }

        if let (Some(ma20), Some(ma60)) = (row.ma_20, row.ma_60) {
            if last_close > ma20 && ma20 > ma60 {
                buy.push(names::MA_BULLISH_ALIGNMENT);
            } else if last_close < ma20 && ma20 < ma60 {
                sell.push(names::MA_BEARISH_ALIGNMENT);
            } else {
                neutral.push(names::MA_MIXED);
            }
        }

        if let (Some(k), Some(d)) = (row.k_value, row.d_value) {
            if k < KD_OVERSOLD && d < KD_OVERSOLD {
                buy.push(names::KD_OVERSOLD);
            } else if k > KD_OVERBOUGHT && d > KD_OVERBOUGHT {
                sell.push(names::KD_OVERBOUGHT);
            } else {
                neutral.push(names::KD_NEUTRAL);
            }
        }

        if let (Some(upper), Some(lower)) = (row.bb_upper, row.bb_lower) {
            if last_close <= lower {
                buy.push(names::BAND_FLOOR_TOUCH);
            } else if last_close >= upper {
                sell.push(names::BAND_CEILING_TOUCH);
            } else {
                neutral.push(names::BAND_INSIDE);
            }
        }

        let owned = |v: Vec<&str>| -> Vec<String> { v.into_iter().map(String::from).collect() };
        SignalSet::from_buckets(owned(buy), owned(sell), owned(neutral))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawBar, SignalDirection};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// `count` consecutive daily bars with closes rising by one from `first`.
    fn rising_buffer(count: usize, first: f64) -> SeriesBuffer {
        let raw = (0..count)
            .map(|i| {
                let close = first + i as f64;
                let date = start() + chrono::Duration::days(i as i64);
                RawBar::new(date, close - 0.5, close + 1.0, close - 1.0, close, 1_000 + i as i64)
            })
            .collect();
        SeriesBuffer::new(1, raw).unwrap()
    }

    #[test]
    fn test_compute_latest_empty_series() {
        let buffer = SeriesBuffer::new(1, vec![]).unwrap();
        let err = IndicatorEngine::default().compute_latest(&buffer).unwrap_err();
        assert!(matches!(err, AppError::Computation(_)));
    }

    #[test]
    fn test_short_history_leaves_long_windows_absent() {
        let row = IndicatorEngine::default()
            .compute_latest(&rising_buffer(25, 100.0))
            .unwrap();
        assert!(row.ma_20.is_some());
        assert!(row.ma_60.is_none());
        assert!(row.ma_240.is_none());
        assert!(row.rsi_14.is_some());
        // MACD needs slow + signal closes
        assert!(row.macd.is_none());
        assert!(row.macd_signal.is_none());
        assert!(row.bb_middle.is_some());
        assert!(row.price_momentum.is_some());
    }

    #[test]
    fn test_full_history_defines_every_field() {
        let row = IndicatorEngine::default()
            .compute_latest(&rising_buffer(240, 50.0))
            .unwrap();
        assert_eq!(row.defined_count(), crate::types::INDICATOR_FIELD_COUNT);
    }

    #[test]
    fn test_compute_for_date_ignores_later_bars() {
        let engine = IndicatorEngine::default();
        let buffer = rising_buffer(40, 100.0);
        let date = start() + chrono::Duration::days(29);

        let row = engine.compute_for_date(&buffer, date).unwrap();
        assert_eq!(row.trade_date, date);
        // closes 110..=129 over the 20 bars ending on day 29
        assert!((row.ma_20.unwrap() - 119.5).abs() < 1e-9);
    }

    #[test]
    fn test_compute_for_date_without_bar() {
        let buffer = rising_buffer(25, 100.0);
        let missing = start() + chrono::Duration::days(100);
        let err = IndicatorEngine::default()
            .compute_for_date(&buffer, missing)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_compute_history_matches_windowed_latest() {
        let engine = IndicatorEngine::default();
        let buffer = rising_buffer(60, 100.0);
        let from = start() + chrono::Duration::days(50);
        let to = start() + chrono::Duration::days(59);

        let rows = engine.compute_history(&buffer, from..=to, 30).unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].trade_date, from);

        let expected = engine.compute_latest(&buffer.slice_ending(to, 30)).unwrap();
        assert_eq!(rows[9], expected);
    }

    #[test]
    fn test_signal_coherence() {
        let mut row = IndicatorRow::empty(1, start());
        row.rsi_14 = Some(25.0);
        row.macd = Some(1.2);
        row.macd_signal = Some(0.8);

        let signals = IndicatorEngine::default().latest_signals(&row, 100.0);
        assert_eq!(
            signals.buy_signals,
            vec![names::RSI_OVERSOLD.to_string(), names::MACD_BULLISH_CROSS.to_string()]
        );
        assert!(signals.sell_signals.is_empty());
        assert_eq!(signals.overall, SignalDirection::Buy);
        assert_eq!(signals.strength, 2);
    }

    #[test]
    fn test_signal_rules() {
        let engine = IndicatorEngine::default();
        let mut row = IndicatorRow::empty(1, start());
        row.rsi_14 = Some(75.0);
        row.macd = Some(0.5);
        row.macd_signal = Some(0.5);
        row.ma_20 = Some(105.0);
        row.ma_60 = Some(110.0);
        row.k_value = Some(50.0);
        row.d_value = Some(85.0);
        row.bb_upper = Some(120.0);
        row.bb_lower = Some(100.0);

        let signals = engine.latest_signals(&row, 100.0);
        assert_eq!(
            signals.sell_signals,
            vec![
                names::RSI_OVERBOUGHT.to_string(),
                names::MACD_BEARISH_CROSS.to_string(),
                names::MA_BEARISH_ALIGNMENT.to_string(),
            ]
        );
        assert_eq!(
            signals.buy_signals,
            vec![names::BAND_FLOOR_TOUCH.to_string()]
        );
        assert_eq!(signals.neutral_signals, vec![names::KD_NEUTRAL.to_string()]);
        assert_eq!(signals.overall, SignalDirection::Sell);
        assert_eq!(signals.strength, 2);
    }

    #[test]
    fn test_signals_on_empty_row_are_neutral() {
        let signals = IndicatorEngine::default().latest_signals(&IndicatorRow::empty(1, start()), 10.0);
        assert!(signals.buy_signals.is_empty());
        assert!(signals.sell_signals.is_empty());
        assert!(signals.neutral_signals.is_empty());
        assert_eq!(signals.overall, SignalDirection::Neutral);
        assert_eq!(signals.strength, 0);
    }
}
