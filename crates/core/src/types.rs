//! Shared market and options types exchanged between collaborators.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A daily price bar from a market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl PriceBar {
    /// Bar carrying only a close price (open/high/low mirror the close).
    pub fn from_close(timestamp: DateTime<Utc>, close: Decimal) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Options contract right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// An options contract specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsContract {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    /// Exchange routing (e.g., "SMART").
    pub exchange: String,
    /// Contract multiplier (100 for standard US equity options).
    pub multiplier: Decimal,
}

impl OptionsContract {
    /// Create a new standard US equity options contract.
    pub fn new(symbol: &str, expiry: NaiveDate, strike: Decimal, right: OptionRight) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            expiry,
            strike,
            right,
            exchange: "SMART".to_string(),
            multiplier: Decimal::from(100),
        }
    }

    /// Human-readable contract description (e.g., "SOXL 28.5P 2026-11-20").
    pub fn display_name(&self) -> String {
        format!("{} {}{} {}", self.symbol, self.strike, self.right, self.expiry)
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    /// Market-on-close.
    MarketOnClose,
    Limit { price: Decimal },
}

/// An order to hand to a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsOrder {
    pub contract: OptionsContract,
    pub side: OrderSide,
    pub quantity: i32,
    pub order_type: OrderType,
}

/// Handle returned by a broker once an order has been accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: String,
    pub contract: OptionsContract,
    pub side: OrderSide,
    pub quantity: i32,
    pub avg_fill_price: Decimal,
    pub commission: Decimal,
    pub submitted_at: DateTime<Utc>,
}

/// An open options position as reported by the broker.
///
/// `quantity` is signed: short positions are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsPosition {
    pub contract: OptionsContract,
    pub quantity: i32,
    /// Premium per share received (short) or paid (long) on entry.
    pub avg_fill_price: Decimal,
    /// Latest premium per share.
    pub current_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl OptionsPosition {
    pub fn ticker(&self) -> &str {
        &self.contract.symbol
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Fraction of the entry premium captured so far.
    ///
    /// For a short position this is `(entry - current) / entry`; for a long
    /// position the sign flips. Zero when the entry premium is zero.
    pub fn premium_captured(&self) -> Decimal {
        if self.avg_fill_price.is_zero() {
            return Decimal::ZERO;
        }
        let change = (self.avg_fill_price - self.current_price) / self.avg_fill_price;
        if self.is_short() {
            change
        } else {
            -change
        }
    }

    /// Days until expiration relative to `today`.
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.contract.expiry - today).num_days()
    }

    /// Entry premium decayed linearly from the open date to expiry.
    ///
    /// Stands in for a quote when none is available. Zero from expiry on,
    /// the full entry premium on or before the open date.
    pub fn time_decay_mark(&self, today: NaiveDate) -> Decimal {
        let remaining = self.days_to_expiry(today);
        if remaining <= 0 {
            return Decimal::ZERO;
        }
        let total = (self.contract.expiry - self.opened_at.date_naive()).num_days();
        if remaining >= total {
            return self.avg_fill_price;
        }
        self.avg_fill_price * Decimal::from(remaining) / Decimal::from(total)
    }
}
