//! CLI commands for the options-selling toolkit.

pub mod bot;
pub mod historical;
pub mod output;
pub mod rsi_sweep;
pub mod scenarios;
pub mod simulate;

pub use bot::{run_bot, BotArgs};
pub use historical::{run_historical_command, HistoricalArgs};
pub use rsi_sweep::{run_rsi_sweep, RsiSweepArgs};
pub use scenarios::{run_scenarios_command, ScenariosArgs};
pub use simulate::{run_simulate, SimulateArgs};
