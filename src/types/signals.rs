use super::InstrumentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Overall direction of a signal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl SignalDirection {
    /// Classify by majority of buy vs sell signals. Ties are neutral.
    pub fn from_counts(buy: usize, sell: usize) -> Self {
        match buy.cmp(&sell) {
            std::cmp::Ordering::Greater => SignalDirection::Buy,
            std::cmp::Ordering::Less => SignalDirection::Sell,
            std::cmp::Ordering::Equal => SignalDirection::Neutral,
        }
    }

    /// Get display label for this direction.
    pub fn label(&self) -> &'static str {
        match self {
            SignalDirection::Buy => "Buy",
            SignalDirection::Sell => "Sell",
            SignalDirection::Neutral => "Neutral",
        }
    }
}

/// Names of the signals emitted by the classifier.
pub mod names {
    pub const RSI_OVERSOLD: &str = "RSI oversold";
    pub const RSI_OVERBOUGHT: &str = "RSI overbought";
    pub const RSI_NEUTRAL: &str = "RSI neutral";
    pub const MACD_BULLISH_CROSS: &str = "MACD bullish cross";
    pub const MACD_BEARISH_CROSS: &str = "MACD bearish cross";
    pub const MA_BULLISH_ALIGNMENT: &str = "MA bullish alignment";
    pub const MA_BEARISH_ALIGNMENT: &str = "MA bearish alignment";
    pub const MA_MIXED: &str = "MA mixed";
    pub const KD_OVERSOLD: &str = "KD oversold";
    pub const KD_OVERBOUGHT: &str = "KD overbought";
    pub const KD_NEUTRAL: &str = "KD neutral";
    pub const BAND_FLOOR_TOUCH: &str = "band floor touch";
    pub const BAND_CEILING_TOUCH: &str = "band ceiling touch";
    pub const BAND_INSIDE: &str = "inside bands";
}

/// Buy/sell/neutral classification derived from the latest indicator row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalSet {
    pub buy_signals: Vec<String>,
    pub sell_signals: Vec<String>,
    pub neutral_signals: Vec<String>,
    pub overall: SignalDirection,
    /// Absolute difference between buy and sell bucket sizes.
    pub strength: usize,
}

impl SignalSet {
    /// Build a signal set from its three buckets.
    pub fn from_buckets(
        buy_signals: Vec<String>,
        sell_signals: Vec<String>,
        neutral_signals: Vec<String>,
    ) -> Self {
        let buy = buy_signals.len();
        let sell = sell_signals.len();
        Self {
            buy_signals,
            sell_signals,
            neutral_signals,
            overall: SignalDirection::from_counts(buy, sell),
            strength: buy.abs_diff(sell),
        }
    }
}

/// Signals for the most recent stored row of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSignals {
    pub instrument_id: InstrumentId,
    pub trade_date: NaiveDate,
    pub last_close: f64,
    pub signals: SignalSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_counts() {
        assert_eq!(SignalDirection::from_counts(3, 1), SignalDirection::Buy);
        assert_eq!(SignalDirection::from_counts(0, 2), SignalDirection::Sell);
        assert_eq!(SignalDirection::from_counts(2, 2), SignalDirection::Neutral);
        assert_eq!(SignalDirection::from_counts(0, 0), SignalDirection::Neutral);
    }

    #[test]
    fn test_signal_set_strength() {
        let set = SignalSet::from_buckets(
            vec![names::RSI_OVERSOLD.to_string()],
            vec![
                names::KD_OVERBOUGHT.to_string(),
                names::BAND_CEILING_TOUCH.to_string(),
                names::MACD_BEARISH_CROSS.to_string(),
            ],
            vec![],
        );
        assert_eq!(set.overall, SignalDirection::Sell);
        assert_eq!(set.strength, 2);
    }

    #[test]
    fn test_direction_serialization() {
        let json = serde_json::to_string(&SignalDirection::Buy).unwrap();
        assert_eq!(json, "\"buy\"");
        assert_eq!(SignalDirection::Neutral.label(), "Neutral");
    }
}
