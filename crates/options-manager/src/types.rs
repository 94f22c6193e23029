//! Types for put-selling position management.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use theta_core::{OptionsContract, OrderHandle};
use theta_ib::AccountValue;
use theta_signals::{EntrySignal, MarketSnapshot, Trend};

/// A ticker that passed every entry rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub ticker: String,
    pub price: Decimal,
    pub rsi: Option<f64>,
    pub trend: Trend,
    pub signal: EntrySignal,
    pub as_of: DateTime<Utc>,
}

impl Opportunity {
    pub fn from_snapshot(snapshot: &MarketSnapshot, signal: EntrySignal) -> Self {
        Self {
            ticker: snapshot.ticker.clone(),
            price: snapshot.price,
            rsi: snapshot.rsi,
            trend: snapshot.trend,
            signal,
            as_of: snapshot.timestamp,
        }
    }
}

/// Sized order for an opportunity, before it reaches the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub contract: OptionsContract,
    pub quantity: i32,
    /// Capital allocated to the trade.
    pub position_value: Decimal,
    /// Premium expected across the whole position.
    pub estimated_premium: Decimal,
    /// Per-share limit price for the sale.
    pub limit_price: Decimal,
    pub expiry: NaiveDate,
}

/// Action the manager can take on a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExitAction {
    /// Buy back the whole short position.
    Close {
        contract: OptionsContract,
        quantity: i32,
        reason: CloseReason,
    },
}

/// Reason for closing a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    ProfitTarget,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfitTarget => write!(f, "profit_target"),
        }
    }
}

/// What one polling cycle saw and did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub account_value: AccountValue,
    pub open_positions: usize,
    pub exits: Vec<ExitAction>,
    pub opportunities: Vec<Opportunity>,
    /// Orders placed this cycle (exits and entries).
    pub orders: Vec<OrderHandle>,
}
