//! Tests for the indicator library and engine through the public API

use chrono::{Duration, NaiveDate};
use daily_indicators::services::indicators::{
    bollinger, ema, macd, momentum, rsi, sma, stochastic, support_resistance, volume_ma,
    williams_r,
};
use daily_indicators::services::{IndicatorEngine, SeriesBuffer};
use daily_indicators::types::{RawBar, SignalDirection};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn buffer_from_closes(closes: &[f64]) -> SeriesBuffer {
    let raw = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| RawBar::new(start() + Duration::days(i as i64), c, c + 2.0, c - 2.0, c, 10_000))
        .collect();
    SeriesBuffer::new(42, raw).unwrap()
}

/// Deterministic noisy closes around 100.
fn noisy(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 + ((i * 13) % 17) as f64 - ((i * 5) % 7) as f64 * 1.3)
        .collect()
}

#[test]
fn test_end_to_end_rising_closes() {
    let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
    let buffer = buffer_from_closes(&closes);
    let last = buffer.last_date().unwrap();

    let row = IndicatorEngine::default().compute_for_date(&buffer, last).unwrap();

    // mean of 105..=124
    let ma_20 = row.ma_20.expect("SMA(20) should be defined");
    assert!((ma_20 - 114.5).abs() < 1e-9);
    assert!(row.ma_60.is_none());
    assert_eq!(row.instrument_id, 42);
    assert_eq!(row.trade_date, last);
}

#[test]
fn test_windowed_indicators_absent_below_period() {
    let closes = noisy(40);

    for p in [2, 5, 10, 20] {
        let short = &closes[..p - 1];
        assert_eq!(sma(short, p).unwrap(), None);
        assert_eq!(ema(short, p).unwrap(), None);
        assert_eq!(bollinger(short, p, 2.0).unwrap(), None);
        assert_eq!(volume_ma(short, p).unwrap(), None);
        assert_eq!(support_resistance(short, short, p).unwrap(), None);
        assert_eq!(williams_r(short, short, short, p).unwrap(), None);
    }

    assert_eq!(rsi(&closes[..14], 14).unwrap(), None);
    assert_eq!(macd(&closes[..34], 12, 26, 9).unwrap(), None);
    assert_eq!(momentum(&closes[..10], 10).unwrap(), None);
    let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
    let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
    assert_eq!(stochastic(&highs[..17], &lows[..17], &closes[..17], 14, 3).unwrap(), None);
}

#[test]
fn test_empty_input_is_absent_not_error() {
    assert_eq!(sma(&[], 5).unwrap(), None);
    assert_eq!(rsi(&[], 14).unwrap(), None);
    assert_eq!(macd(&[], 12, 26, 9).unwrap(), None);
}

#[test]
fn test_zero_period_is_computation_error() {
    assert!(sma(&[1.0, 2.0], 0).is_err());
    assert!(rsi(&[1.0, 2.0], 0).is_err());
    assert!(bollinger(&[1.0, 2.0], 0, 2.0).is_err());
}

#[test]
fn test_sma_strictly_inside_trailing_range() {
    for p in [2, 5, 20, 60] {
        let closes: Vec<f64> = (0..p + 7).map(|i| 50.0 + i as f64 * 0.75).collect();
        let window = &closes[closes.len() - p..];
        let value = sma(&closes, p).unwrap().unwrap();
        assert!(value > window[0] && value < window[p - 1], "p={} value={}", p, value);
    }
}

#[test]
fn test_rsi_bounded() {
    for len in 15..80 {
        let value = rsi(&noisy(len), 14).unwrap().unwrap();
        assert!((0.0..=100.0).contains(&value), "len={} rsi={}", len, value);
    }
}

#[test]
fn test_bands_ordered() {
    let closes = noisy(60);
    for end in 20..=closes.len() {
        let bands = bollinger(&closes[..end], 20, 2.0).unwrap().unwrap();
        assert!(bands.lower <= bands.middle && bands.middle <= bands.upper);
    }
}

#[test]
fn test_engine_signals_from_computed_row() {
    // a steady decline: every change is a loss, price sits below its averages
    let closes: Vec<f64> = (0..80).map(|i| 200.0 - i as f64 * 1.5).collect();
    let buffer = buffer_from_closes(&closes);
    let engine = IndicatorEngine::default();

    let row = engine.compute_latest(&buffer).unwrap();
    assert_eq!(row.rsi_14, Some(0.0));
    let signals = engine.latest_signals(&row, buffer.last_close().unwrap());

    assert!(signals.buy_signals.contains(&"RSI oversold".to_string()));
    assert!(signals.buy_signals.contains(&"KD oversold".to_string()));
    assert!(signals
        .sell_signals
        .contains(&"MA bearish alignment".to_string()));
    assert!(signals.neutral_signals.contains(&"inside bands".to_string()));
    assert_eq!(
        signals.strength,
        signals.sell_signals.len().abs_diff(signals.buy_signals.len())
    );
    assert_ne!(signals.overall, SignalDirection::Sell);
}
