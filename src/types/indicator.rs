use super::InstrumentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of indicator value columns in an [`IndicatorRow`].
pub const INDICATOR_FIELD_COUNT: usize = 24;

/// Column names of the indicator values, in [`IndicatorRow::values`] order.
pub const INDICATOR_COLUMNS: [&str; INDICATOR_FIELD_COUNT] = [
    "ma_5",
    "ma_10",
    "ma_20",
    "ma_60",
    "ma_120",
    "ma_240",
    "ema_12",
    "ema_26",
    "rsi_14",
    "macd",
    "macd_signal",
    "macd_histogram",
    "k_value",
    "d_value",
    "bb_upper",
    "bb_middle",
    "bb_lower",
    "volume_ma_5",
    "volume_ma_20",
    "support_level",
    "resistance_level",
    "price_momentum",
    "volume_ratio",
    "williams_r",
];

/// Indicator values for one instrument on one trade date.
///
/// `None` means "not computable from the available history". Zero is a
/// legitimate computed value and is never used as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub instrument_id: InstrumentId,
    pub trade_date: NaiveDate,

    // Moving averages
    pub ma_5: Option<f64>,
    pub ma_10: Option<f64>,
    pub ma_20: Option<f64>,
    pub ma_60: Option<f64>,
    pub ma_120: Option<f64>,
    pub ma_240: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,

    // Oscillators
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub k_value: Option<f64>,
    pub d_value: Option<f64>,

    // Bands
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,

    // Volume
    pub volume_ma_5: Option<f64>,
    pub volume_ma_20: Option<f64>,

    // Levels and momentum
    pub support_level: Option<f64>,
    pub resistance_level: Option<f64>,
    pub price_momentum: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub williams_r: Option<f64>,
}

impl IndicatorRow {
    /// A row with every indicator absent.
    pub fn empty(instrument_id: InstrumentId, trade_date: NaiveDate) -> Self {
        Self::from_values(instrument_id, trade_date, [None; INDICATOR_FIELD_COUNT])
    }

    /// Indicator values in [`INDICATOR_COLUMNS`] order.
    pub fn values(&self) -> [Option<f64>; INDICATOR_FIELD_COUNT] {
        [
            self.ma_5,
            self.ma_10,
            self.ma_20,
            self.ma_60,
            self.ma_120,
            self.ma_240,
            self.ema_12,
            self.ema_26,
            self.rsi_14,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.k_value,
            self.d_value,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.volume_ma_5,
            self.volume_ma_20,
            self.support_level,
            self.resistance_level,
            self.price_momentum,
            self.volume_ratio,
            self.williams_r,
        ]
    }

    /// Rebuild a row from values in [`INDICATOR_COLUMNS`] order.
    pub fn from_values(
        instrument_id: InstrumentId,
        trade_date: NaiveDate,
        values: [Option<f64>; INDICATOR_FIELD_COUNT],
    ) -> Self {
        let [
            ma_5,
            ma_10,
            ma_20,
            ma_60,
            ma_120,
            ma_240,
            ema_12,
            ema_26,
            rsi_14,
            macd,
            macd_signal,
            macd_histogram,
            k_value,
            d_value,
            bb_upper,
            bb_middle,
            bb_lower,
            volume_ma_5,
            volume_ma_20,
            support_level,
            resistance_level,
            price_momentum,
            volume_ratio,
            williams_r,
        ] = values;

        Self {
            instrument_id,
            trade_date,
            ma_5,
            ma_10,
            ma_20,
            ma_60,
            ma_120,
            ma_240,
            ema_12,
            ema_26,
            rsi_14,
            macd,
            macd_signal,
            macd_histogram,
            k_value,
            d_value,
            bb_upper,
            bb_middle,
            bb_lower,
            volume_ma_5,
            volume_ma_20,
            support_level,
            resistance_level,
            price_momentum,
            volume_ratio,
            williams_r,
        }
    }

    /// Overlay the defined values of `computed` onto this row.
    ///
    /// Fields that `computed` leaves absent keep their stored value, so a
    /// partial recompute never erases what another job wrote.
    pub fn merge_from(&mut self, computed: &IndicatorRow) {
        let mut merged = self.values();
        for (slot, value) in merged.iter_mut().zip(computed.values()) {
            if value.is_some() {
                *slot = value;
            }
        }
        *self = Self::from_values(self.instrument_id, self.trade_date, merged);
    }

    /// Number of indicators with a computed value.
    pub fn defined_count(&self) -> usize {
        self.values().iter().filter(|v| v.is_some()).count()
    }
}
