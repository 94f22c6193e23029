//! Deterministic put-selling position management.
//!
//! Runs as a long-lived service that:
//! - Closes short puts once the take-profit share of premium is captured
//! - Scans the watchlist for red-day pullbacks in an uptrend
//! - Sizes cash-secured puts from the current account value
//! - Places orders only when auto-execution is enabled
//!
//! No discretionary input in the execution path; all rules are deterministic.

pub mod executor;
pub mod scanner;
pub mod service;
pub mod targets;
pub mod types;

pub use executor::{execute_exit, execute_trade, plan_trade};
pub use scanner::scan_opportunities;
pub use service::OptionsBot;
pub use targets::{check_exit, check_exits};
pub use types::{CloseReason, CycleReport, ExitAction, Opportunity, TradePlan};
