use thiserror::Error;

use theta_signals::SignalError;

/// The simulator's only failure: a parameter outside its domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },
}

impl SimulationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors from the historical backtests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BacktestError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Too little price history to run the backtest.
    #[error("Insufficient data for {ticker}: need {required} bars, have {available}")]
    InsufficientData {
        ticker: String,
        required: usize,
        available: usize,
    },

    #[error("Indicator error: {0}")]
    Signal(#[from] SignalError),
}
