//! Capital path simulation and historical backtests for premium selling.
//!
//! - [`monte_carlo`]: the Monte Carlo capital path simulator
//! - [`summary`]: reductions over simulated runs
//! - [`scenarios`]: named win-rate/premium fixtures
//! - [`historical`]: red-day put-selling approximation over price history
//! - [`rsi_threshold`]: RSI entry backtest with weekly/monthly sweep

pub mod error;
pub mod historical;
pub mod monte_carlo;
pub mod rsi_threshold;
pub mod scenarios;
pub mod summary;

pub use error::{BacktestError, SimulationError};
pub use historical::{backtest_ticker, run_historical, HistoricalResult, HistoricalSummary};
pub use monte_carlo::{
    simulate, simulate_parallel, CapitalPath, MonteCarloSimulator, SimulationConfig,
    SimulationReport, SimulationResult,
};
pub use rsi_threshold::{run_sweep, SweepReport, Timeframe};
pub use scenarios::{run_scenarios, standard_scenarios, Scenario, ScenarioOutcome};
pub use summary::{DistributionSummary, MonthlyTarget, SimulationSummary};
