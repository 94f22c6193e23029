//! Red-day put-selling approximation over historical closes.
//!
//! There is no options history behind this: each red-day entry draws an
//! implied volatility, prices the premium as `iv * sqrt(dte / 365) * scale`
//! of the position and settles the trade with a fixed win probability.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use theta_core::{HistoricalParams, PriceBar};
use theta_signals::{closes, is_red_day};
use tracing::{debug, info, warn};

use crate::error::{BacktestError, SimulationError};
use crate::summary::{mean_decimal, MonthlyTarget};

/// One simulated short put.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumTrade {
    pub timestamp: DateTime<Utc>,
    pub implied_volatility: f64,
    pub position_value: Decimal,
    pub premium: Decimal,
    pub profit: Decimal,
    /// Profit as a fraction of the position.
    pub return_on_position: Decimal,
    pub won: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalResult {
    pub ticker: String,
    pub trades: Vec<PremiumTrade>,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub total_return_pct: Decimal,
}

impl HistoricalResult {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn win_count(&self) -> usize {
        self.trades.iter().filter(|t| t.won).count()
    }
}

/// Premium as a fraction of the position for a given volatility and tenor.
pub fn estimate_premium_pct(implied_volatility: f64, dte: u32, scale: f64) -> f64 {
    implied_volatility * (f64::from(dte) / 365.0).sqrt() * scale
}

/// # Errors
/// Returns `SimulationError::InvalidConfiguration` naming the offending field.
pub fn validate(params: &HistoricalParams) -> Result<(), SimulationError> {
    if params.initial_capital <= Decimal::ZERO {
        return Err(SimulationError::invalid("initial_capital", "must be positive"));
    }
    if params.position_fraction <= Decimal::ZERO || params.position_fraction > Decimal::ONE {
        return Err(SimulationError::invalid(
            "position_fraction",
            "must be within (0, 1]",
        ));
    }
    if !(0.0..=1.0).contains(&params.win_probability) {
        return Err(SimulationError::invalid(
            "win_probability",
            "must be within [0, 1]",
        ));
    }
    if !(params.iv_low >= 0.0 && params.iv_low < params.iv_high && params.iv_high.is_finite()) {
        return Err(SimulationError::invalid(
            "iv_low",
            format!(
                "volatility range [{}, {}) is empty or negative",
                params.iv_low, params.iv_high
            ),
        ));
    }
    if !(params.premium_scale > 0.0 && params.premium_scale.is_finite()) {
        return Err(SimulationError::invalid("premium_scale", "must be positive"));
    }
    if params.itm_loss_fraction < Decimal::ZERO {
        return Err(SimulationError::invalid(
            "itm_loss_fraction",
            "must not be negative",
        ));
    }
    Ok(())
}

/// Backtests one ticker's daily bars (oldest first).
///
/// Entries are considered from bar `warmup_bars` up to the last bar that
/// still leaves `dte_target` bars to expiry. Each red day opens a trade;
/// a loss keeps the premium but gives back `itm_loss_fraction` of the
/// position. The position is resized to `capital * position_fraction` after
/// every trade.
///
/// # Errors
/// - `BacktestError::InsufficientData` when fewer than `min_bars` bars exist
/// - `BacktestError::Simulation` when `params` fail [`validate`]
pub fn backtest_ticker<R: Rng + ?Sized>(
    ticker: &str,
    bars: &[PriceBar],
    params: &HistoricalParams,
    rng: &mut R,
) -> Result<HistoricalResult, BacktestError> {
    validate(params)?;
    if bars.len() < params.min_bars {
        return Err(BacktestError::InsufficientData {
            ticker: ticker.to_string(),
            required: params.min_bars,
            available: bars.len(),
        });
    }

    let prices = closes(bars);
    let start = params.warmup_bars.max(1);
    let end = bars.len().saturating_sub(params.dte_target as usize);

    let mut capital = params.initial_capital;
    let mut position_value = capital * params.position_fraction;
    let mut trades = Vec::new();

    for i in start..end {
        if !is_red_day(&prices[..=i]) {
            continue;
        }

        let iv = rng.gen_range(params.iv_low..params.iv_high);
        let premium_pct = estimate_premium_pct(iv, params.dte_target, params.premium_scale);
        if premium_pct < params.min_premium_return {
            continue;
        }
        let Some(premium_pct) = Decimal::from_f64(premium_pct) else {
            continue;
        };

        let premium = position_value * premium_pct;
        let won = rng.gen::<f64>() < params.win_probability;
        let profit = if won {
            premium
        } else {
            premium - position_value * params.itm_loss_fraction
        };

        capital += profit;
        trades.push(PremiumTrade {
            timestamp: bars[i].timestamp,
            implied_volatility: iv,
            position_value,
            premium,
            profit,
            return_on_position: profit / position_value,
            won,
        });

        position_value = capital * params.position_fraction;
    }

    let total_return_pct = (capital - params.initial_capital) / params.initial_capital * dec!(100);
    debug!(
        ticker,
        trades = trades.len(),
        final_capital = %capital,
        "Historical backtest complete"
    );

    Ok(HistoricalResult {
        ticker: ticker.to_string(),
        trades,
        initial_capital: params.initial_capital,
        final_capital: capital,
        total_return_pct,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSummary {
    pub results: Vec<HistoricalResult>,
    /// Tickers that could not be backtested, with the reason.
    pub skipped: Vec<(String, String)>,
    pub average_return_pct: Decimal,
    pub total_trades: usize,
    /// Average return spread over the months in the lookback.
    pub monthly_average_pct: Decimal,
    pub best: Option<(String, Decimal)>,
    pub worst: Option<(String, Decimal)>,
}

impl HistoricalSummary {
    pub fn monthly_target(&self) -> MonthlyTarget {
        MonthlyTarget::assess(self.monthly_average_pct)
    }
}

/// Backtests every ticker in `series` and aggregates the outcomes.
///
/// Ticker `i` draws from stream `i` of a ChaCha8 generator seeded with
/// `seed`. Tickers without enough history are logged and skipped.
///
/// # Errors
/// Returns `BacktestError::Simulation` when `params` are invalid.
pub fn run_historical(
    series: &[(String, Vec<PriceBar>)],
    params: &HistoricalParams,
    seed: u64,
) -> Result<HistoricalSummary, BacktestError> {
    validate(params)?;

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for (stream, (ticker, bars)) in series.iter().enumerate() {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream as u64);

        match backtest_ticker(ticker, bars, params, &mut rng) {
            Ok(result) => {
                info!(
                    ticker = %result.ticker,
                    trades = result.trade_count(),
                    return_pct = %result.total_return_pct.round_dp(2),
                    "Ticker backtested"
                );
                results.push(result);
            }
            Err(e @ BacktestError::InsufficientData { .. }) => {
                warn!(ticker = %ticker, error = %e, "Skipping ticker");
                skipped.push((ticker.clone(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summarize(results, skipped, params.lookback_days))
}

fn summarize(
    results: Vec<HistoricalResult>,
    skipped: Vec<(String, String)>,
    lookback_days: u32,
) -> HistoricalSummary {
    let returns: Vec<Decimal> = results.iter().map(|r| r.total_return_pct).collect();
    let average_return_pct = mean_decimal(&returns);

    let months = Decimal::from(lookback_days) * dec!(12) / dec!(365);
    let monthly_average_pct = if months.is_zero() {
        Decimal::ZERO
    } else {
        average_return_pct / months
    };

    let best = results
        .iter()
        .max_by_key(|r| r.total_return_pct)
        .map(|r| (r.ticker.clone(), r.total_return_pct));
    let worst = results
        .iter()
        .min_by_key(|r| r.total_return_pct)
        .map(|r| (r.ticker.clone(), r.total_return_pct));

    HistoricalSummary {
        total_trades: results.iter().map(HistoricalResult::trade_count).sum(),
        results,
        skipped,
        average_return_pct,
        monthly_average_pct,
        best,
        worst,
    }
}
