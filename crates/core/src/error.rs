//! Error types for the market-data and broker collaborator seams.

use thiserror::Error;

/// Errors from a market-data provider.
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// No history exists for the ticker.
    #[error("No price history for {ticker}")]
    NotFound { ticker: String },

    /// Not enough bars to compute what the caller asked for.
    #[error("Insufficient history for {ticker}: need {required} bars, have {available}")]
    InsufficientHistory {
        ticker: String,
        required: usize,
        available: usize,
    },

    /// A record could not be parsed.
    #[error("Failed to parse price history: {0}")]
    Parse(String),

    /// IO error reading the underlying source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a broker client.
///
/// `NotConnected` means no session exists at all and callers may fall back to
/// simulated defaults. `Transient` means a session exists but a request
/// failed; callers should surface it rather than substitute a default.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No broker session is available.
    #[error("Broker not connected")]
    NotConnected,

    /// The request failed but may succeed on a later attempt.
    #[error("Transient broker error: {0}")]
    Transient(String),

    /// The broker refused the order.
    #[error("Order rejected: {0}")]
    Rejected(String),
}

impl BrokerError {
    /// True when the caller may fall back to simulated values.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}
