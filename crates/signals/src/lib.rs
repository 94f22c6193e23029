//! Price indicators and entry rules.
//!
//! RSI and EMA live in one place ([`indicators`]) as lazy iterator adapters;
//! the entry rules, the backtests and the bot all reuse them.

pub mod entry;
pub mod indicators;

use thiserror::Error;

pub use entry::{iv_rank, EntryRules, EntrySignal, MarketSnapshot, Trend, MIN_SNAPSHOT_BARS};
pub use indicators::{closes, is_red_day, Ema, IndicatorExt, Rsi};

/// Errors from indicator construction and snapshot evaluation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// Lookback of zero.
    #[error("{indicator} period must be > 0, got {period}")]
    InvalidPeriod {
        indicator: &'static str,
        period: usize,
    },

    /// Not enough price history.
    #[error("Insufficient bars: need {required}, have {available}")]
    InsufficientBars { required: usize, available: usize },
}
