//! Entry rules for selling puts: red day, RSI below threshold, bullish EMA trend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use theta_core::{PriceBar, StrategyConfig};

use crate::indicators::{closes, is_red_day, IndicatorExt};
use crate::SignalError;

/// Minimum bars required before a snapshot is computed.
pub const MIN_SNAPSHOT_BARS: usize = 50;

/// Direction of the fast/slow EMA crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

/// Indicator state at the latest bar of a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    /// `None` when the latest RSI window is flat.
    pub rsi: Option<f64>,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub trend: Trend,
    pub is_red_day: bool,
}

/// Signal produced when every entry condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySignal {
    SellPut,
}

impl std::fmt::Display for EntrySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SellPut => write!(f, "SELL_PUT"),
        }
    }
}

/// Thresholds and lookbacks for the entry check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRules {
    pub rsi_period: usize,
    pub rsi_entry: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
}

impl Default for EntryRules {
    fn default() -> Self {
        Self::from_strategy(&StrategyConfig::default())
    }
}

impl EntryRules {
    #[must_use]
    pub fn from_strategy(config: &StrategyConfig) -> Self {
        Self {
            rsi_period: config.rsi_period,
            rsi_entry: config.rsi_entry,
            ema_fast: config.ema_fast,
            ema_slow: config.ema_slow,
        }
    }

    /// Computes the latest indicator snapshot for `bars` (oldest first).
    ///
    /// # Errors
    /// Fails with fewer than [`MIN_SNAPSHOT_BARS`] bars or a zero lookback.
    pub fn snapshot(&self, ticker: &str, bars: &[PriceBar]) -> Result<MarketSnapshot, SignalError> {
        if bars.len() < MIN_SNAPSHOT_BARS {
            return Err(SignalError::InsufficientBars {
                required: MIN_SNAPSHOT_BARS,
                available: bars.len(),
            });
        }

        let prices = closes(bars);
        let rsi = prices.iter().copied().rsi(self.rsi_period)?.last().flatten();
        let ema_fast = prices.iter().copied().ema(self.ema_fast)?.last();
        let ema_slow = prices.iter().copied().ema(self.ema_slow)?.last();
        let (Some(ema_fast), Some(ema_slow), Some(latest)) = (ema_fast, ema_slow, bars.last())
        else {
            return Err(SignalError::InsufficientBars {
                required: MIN_SNAPSHOT_BARS,
                available: 0,
            });
        };

        let trend = if ema_fast > ema_slow {
            Trend::Bullish
        } else {
            Trend::Bearish
        };

        Ok(MarketSnapshot {
            ticker: ticker.to_uppercase(),
            timestamp: latest.timestamp,
            price: latest.close,
            rsi,
            ema_fast,
            ema_slow,
            trend,
            is_red_day: is_red_day(&prices),
        })
    }

    /// Returns `SellPut` when the snapshot is a red day with RSI below the
    /// entry level in a bullish trend.
    #[must_use]
    pub fn evaluate(&self, snapshot: &MarketSnapshot) -> Option<EntrySignal> {
        let rsi_ok = snapshot.rsi.is_some_and(|rsi| rsi < self.rsi_entry);
        let trend_ok = snapshot.trend == Trend::Bullish;

        debug!(
            ticker = snapshot.ticker,
            red_day = snapshot.is_red_day,
            rsi = ?snapshot.rsi,
            trend = %snapshot.trend,
            "Evaluated entry conditions"
        );

        (snapshot.is_red_day && rsi_ok && trend_ok).then_some(EntrySignal::SellPut)
    }
}

/// Rank of `iv` within its historical range, in `[0, 1]` for values inside
/// the range.
///
/// With fewer than 30 samples the rank is approximated as `iv / 100`; a flat
/// history ranks at the midpoint.
pub fn iv_rank(iv: f64, history: &[f64]) -> f64 {
    if history.len() < 30 {
        return iv / 100.0;
    }

    let low = history.iter().copied().fold(f64::INFINITY, f64::min);
    let high = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if high == low {
        return 0.5;
    }
    (iv - low) / (high - low)
}
