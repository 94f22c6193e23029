//! Broker clients for options trading.
//!
//! Provides an in-memory paper broker, an offline broker for runs without a
//! gateway session, and account helpers that make the simulated fallback
//! explicit. Used by `options-manager` for position management.

pub mod account;
pub mod offline;
pub mod paper;

pub use account::{resolve_account_value, resolve_positions, AccountValue};
pub use offline::OfflineBroker;
pub use paper::{PaperBroker, DEFAULT_COMMISSION_PER_CONTRACT};
