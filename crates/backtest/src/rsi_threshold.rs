//! Long-only RSI threshold backtest on daily bars with daily, weekly or
//! monthly RSI.
//!
//! Higher-timeframe RSI is computed on period-end closes and carried onto
//! each daily bar from the latest period that has already ended. Bars are
//! kept only once all three timeframes have a value, so every timeframe is
//! tested over the same window.
//!
//! Orders are placed on a bar's RSI and filled at the next bar's open, with
//! commission charged on both legs as a fraction of notional.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use theta_core::{PriceBar, RsiBacktestParams};
use theta_signals::{closes, IndicatorExt, SignalError};
use tracing::{debug, info, warn};

use crate::error::{BacktestError, SimulationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Label of the period containing `date`: the date itself, the Sunday
/// ending its week, or the last day of its month.
pub fn period_end(date: NaiveDate, timeframe: Timeframe) -> NaiveDate {
    match timeframe {
        Timeframe::Daily => date,
        Timeframe::Weekly => {
            let to_sunday = 7 - date.weekday().number_from_monday();
            date + Days::new(u64::from(to_sunday))
        }
        Timeframe::Monthly => date
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date),
    }
}

/// RSI of `timeframe` closes, aligned one value per daily bar.
///
/// # Errors
/// Returns `SignalError::InvalidPeriod` when `period` is zero.
pub fn timeframe_rsi(
    bars: &[PriceBar],
    timeframe: Timeframe,
    period: usize,
) -> Result<Vec<Option<f64>>, SignalError> {
    if timeframe == Timeframe::Daily {
        return Ok(closes(bars).into_iter().rsi(period)?.collect());
    }

    // Last close of each period; bars are oldest first so periods are contiguous
    let mut periods: Vec<(NaiveDate, f64)> = Vec::new();
    for (bar, close) in bars.iter().zip(closes(bars)) {
        let label = period_end(bar.timestamp.date_naive(), timeframe);
        match periods.last_mut() {
            Some((last, value)) if *last == label => *value = close,
            _ => periods.push((label, close)),
        }
    }

    let values: Vec<Option<f64>> = periods.iter().map(|(_, c)| *c).rsi(period)?.collect();

    let mut aligned = Vec::with_capacity(bars.len());
    let mut next_period = 0;
    let mut current = None;
    for bar in bars {
        let date = bar.timestamp.date_naive();
        while next_period < periods.len() && periods[next_period].0 <= date {
            current = values[next_period];
            next_period += 1;
        }
        aligned.push(current);
    }
    Ok(aligned)
}

/// # Errors
/// Returns `SimulationError::InvalidConfiguration` naming the offending field.
pub fn validate(params: &RsiBacktestParams) -> Result<(), SimulationError> {
    if params.initial_cash <= Decimal::ZERO {
        return Err(SimulationError::invalid("initial_cash", "must be positive"));
    }
    if params.commission < Decimal::ZERO || params.commission >= Decimal::ONE {
        return Err(SimulationError::invalid("commission", "must be within [0, 1)"));
    }
    if params.hold_bars.contains(&0) {
        return Err(SimulationError::invalid("hold_bars", "must all be positive"));
    }
    if !params.rsi_threshold.is_finite() {
        return Err(SimulationError::invalid("rsi_threshold", "must be finite"));
    }
    Ok(())
}

/// A completed long trade. Prices include commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
}

impl RoundTrip {
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

/// Parameters of a single strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiStrategy {
    pub timeframe: Timeframe,
    pub hold_bars: usize,
    pub rsi_period: usize,
    pub threshold: f64,
    pub initial_cash: Decimal,
    pub commission: Decimal,
}

impl RsiStrategy {
    pub fn from_params(params: &RsiBacktestParams, timeframe: Timeframe, hold_bars: usize) -> Self {
        Self {
            timeframe,
            hold_bars,
            rsi_period: params.rsi_period,
            threshold: params.rsi_threshold,
            initial_cash: params.initial_cash,
            commission: params.commission,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiBacktestResult {
    pub ticker: String,
    pub timeframe: Timeframe,
    pub hold_bars: usize,
    pub trades: Vec<RoundTrip>,
    pub initial_cash: Decimal,
    pub final_equity: Decimal,
    pub return_pct: Decimal,
}

impl RsiBacktestResult {
    pub fn win_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_win()).count()
    }

    pub fn win_rate_pct(&self) -> Decimal {
        if self.trades.is_empty() {
            return Decimal::ZERO;
        }
        Decimal::from(self.win_count()) / Decimal::from(self.trades.len()) * dec!(100)
    }
}

struct OpenTrade {
    signal_index: usize,
    entry_time: DateTime<Utc>,
    shares: Decimal,
    entry_price: Decimal,
}

impl OpenTrade {
    fn close(self, exit_price: Decimal, exit_time: DateTime<Utc>) -> RoundTrip {
        RoundTrip {
            entry_time: self.entry_time,
            exit_time,
            shares: self.shares,
            entry_price: self.entry_price,
            exit_price,
            pnl: self.shares * (exit_price - self.entry_price),
        }
    }
}

enum Order {
    Buy { signal_index: usize },
    Sell,
}

/// Runs the strategy over `bars` with one RSI value per bar.
///
/// Buys all-in (whole shares) when flat and RSI is below the threshold,
/// sells `hold_bars` bars after the signal bar. A trade still open on the
/// last bar is closed at its close.
pub fn run_strategy(
    ticker: &str,
    bars: &[PriceBar],
    rsi: &[Option<f64>],
    strategy: &RsiStrategy,
) -> RsiBacktestResult {
    let buy_cost = Decimal::ONE + strategy.commission;
    let sell_proceeds = Decimal::ONE - strategy.commission;

    let mut cash = strategy.initial_cash;
    let mut open: Option<OpenTrade> = None;
    let mut pending: Option<Order> = None;
    let mut trades = Vec::new();

    for (k, (bar, value)) in bars.iter().zip(rsi).enumerate() {
        match pending.take() {
            Some(Order::Buy { signal_index }) => {
                let price = bar.open * buy_cost;
                if price > Decimal::ZERO {
                    let shares = (cash / price).floor();
                    if shares > Decimal::ZERO {
                        cash -= shares * price;
                        open = Some(OpenTrade {
                            signal_index,
                            entry_time: bar.timestamp,
                            shares,
                            entry_price: price,
                        });
                    }
                }
            }
            Some(Order::Sell) => {
                if let Some(trade) = open.take() {
                    let price = bar.open * sell_proceeds;
                    cash += trade.shares * price;
                    trades.push(trade.close(price, bar.timestamp));
                }
            }
            None => {}
        }

        if k + 1 < strategy.rsi_period {
            continue;
        }
        let Some(value) = *value else {
            continue;
        };

        match &open {
            None if value < strategy.threshold => {
                pending = Some(Order::Buy { signal_index: k });
            }
            Some(trade) if k - trade.signal_index >= strategy.hold_bars => {
                pending = Some(Order::Sell);
            }
            _ => {}
        }
    }

    if let (Some(trade), Some(last)) = (open.take(), bars.last()) {
        let price = last.close * sell_proceeds;
        cash += trade.shares * price;
        trades.push(trade.close(price, last.timestamp));
    }

    let return_pct = (cash - strategy.initial_cash) / strategy.initial_cash * dec!(100);
    RsiBacktestResult {
        ticker: ticker.to_string(),
        timeframe: strategy.timeframe,
        hold_bars: strategy.hold_bars,
        trades,
        initial_cash: strategy.initial_cash,
        final_equity: cash,
        return_pct,
    }
}

/// A ticker's bars with daily, weekly and monthly RSI, trimmed to the rows
/// where all three are defined.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    ticker: String,
    bars: Vec<PriceBar>,
    daily: Vec<Option<f64>>,
    weekly: Vec<Option<f64>>,
    monthly: Vec<Option<f64>>,
}

impl PreparedSeries {
    /// # Errors
    /// - `BacktestError::InsufficientData` when the raw history is shorter
    ///   than `min_history_bars` or fewer than `min_signal_bars` rows remain
    /// - `BacktestError::Signal` when `rsi_period` is zero
    pub fn new(
        ticker: &str,
        bars: &[PriceBar],
        params: &RsiBacktestParams,
    ) -> Result<Self, BacktestError> {
        if bars.len() < params.min_history_bars {
            return Err(BacktestError::InsufficientData {
                ticker: ticker.to_string(),
                required: params.min_history_bars,
                available: bars.len(),
            });
        }

        let daily = timeframe_rsi(bars, Timeframe::Daily, params.rsi_period)?;
        let weekly = timeframe_rsi(bars, Timeframe::Weekly, params.rsi_period)?;
        let monthly = timeframe_rsi(bars, Timeframe::Monthly, params.rsi_period)?;

        let keep: Vec<usize> = (0..bars.len())
            .filter(|&i| daily[i].is_some() && weekly[i].is_some() && monthly[i].is_some())
            .collect();
        if keep.len() < params.min_signal_bars {
            return Err(BacktestError::InsufficientData {
                ticker: ticker.to_string(),
                required: params.min_signal_bars,
                available: keep.len(),
            });
        }

        Ok(Self {
            ticker: ticker.to_string(),
            bars: keep.iter().map(|&i| bars[i].clone()).collect(),
            daily: keep.iter().map(|&i| daily[i]).collect(),
            weekly: keep.iter().map(|&i| weekly[i]).collect(),
            monthly: keep.iter().map(|&i| monthly[i]).collect(),
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn rsi(&self, timeframe: Timeframe) -> &[Option<f64>] {
        match timeframe {
            Timeframe::Daily => &self.daily,
            Timeframe::Weekly => &self.weekly,
            Timeframe::Monthly => &self.monthly,
        }
    }

    pub fn run(&self, strategy: &RsiStrategy) -> RsiBacktestResult {
        run_strategy(&self.ticker, &self.bars, self.rsi(strategy.timeframe), strategy)
    }
}

/// Aggregate of one (timeframe, hold) configuration across tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub timeframe: Timeframe,
    pub hold_bars: usize,
    /// Tickers that traded at least once.
    pub tickers: usize,
    pub trades: usize,
    pub wins: usize,
    pub avg_return_pct: Decimal,
    pub win_rate_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeComparison {
    pub weekly_avg_pct: Decimal,
    pub monthly_avg_pct: Decimal,
    pub winner: Timeframe,
    pub margin_pct: Decimal,
}

impl TimeframeComparison {
    /// Compares the mean of the weekly and monthly rows. `None` unless both
    /// timeframes have rows.
    pub fn from_rows(rows: &[SweepRow]) -> Option<Self> {
        let mean_of = |tf: Timeframe| {
            let returns: Vec<Decimal> = rows
                .iter()
                .filter(|r| r.timeframe == tf)
                .map(|r| r.avg_return_pct)
                .collect();
            (!returns.is_empty())
                .then(|| returns.iter().copied().sum::<Decimal>() / Decimal::from(returns.len()))
        };

        let weekly = mean_of(Timeframe::Weekly)?;
        let monthly = mean_of(Timeframe::Monthly)?;
        let (winner, margin) = if weekly > monthly {
            (Timeframe::Weekly, weekly - monthly)
        } else {
            (Timeframe::Monthly, monthly - weekly)
        };
        Some(Self {
            weekly_avg_pct: weekly,
            monthly_avg_pct: monthly,
            winner,
            margin_pct: margin,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub rows: Vec<SweepRow>,
    pub comparison: Option<TimeframeComparison>,
    pub best: Option<SweepRow>,
    pub skipped: Vec<(String, String)>,
}

/// Weekly then monthly, each with every hold period.
pub fn sweep_configs(hold_bars: &[usize]) -> Vec<(Timeframe, usize)> {
    [Timeframe::Weekly, Timeframe::Monthly]
        .into_iter()
        .flat_map(|tf| hold_bars.iter().map(move |&hold| (tf, hold)))
        .collect()
}

#[derive(Default)]
struct Accumulator {
    returns: Vec<Decimal>,
    trades: usize,
    wins: usize,
}

/// Runs every sweep configuration over every ticker.
///
/// Runs without trades are left out of the averages. Tickers with too
/// little history are logged and skipped.
///
/// # Errors
/// Returns `BacktestError::Simulation` for invalid parameters and
/// `BacktestError::Signal` for a zero RSI period.
pub fn run_sweep(
    series: &[(String, Vec<PriceBar>)],
    params: &RsiBacktestParams,
) -> Result<SweepReport, BacktestError> {
    validate(params)?;

    let configs = sweep_configs(&params.hold_bars);
    let mut totals: Vec<Accumulator> = configs.iter().map(|_| Accumulator::default()).collect();
    let mut skipped = Vec::new();

    for (ticker, bars) in series {
        let prepared = match PreparedSeries::new(ticker, bars, params) {
            Ok(p) => p,
            Err(e @ BacktestError::InsufficientData { .. }) => {
                warn!(ticker = %ticker, error = %e, "Skipping ticker");
                skipped.push((ticker.clone(), e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };

        for (&(timeframe, hold), total) in configs.iter().zip(totals.iter_mut()) {
            let result = prepared.run(&RsiStrategy::from_params(params, timeframe, hold));
            if result.trades.is_empty() {
                continue;
            }
            debug!(
                ticker = %ticker,
                %timeframe,
                hold,
                trades = result.trades.len(),
                return_pct = %result.return_pct.round_dp(2),
                "RSI backtest"
            );
            total.returns.push(result.return_pct);
            total.trades += result.trades.len();
            total.wins += result.win_count();
        }
    }

    let rows: Vec<SweepRow> = configs
        .iter()
        .zip(totals)
        .filter(|(_, total)| !total.returns.is_empty())
        .map(|(&(timeframe, hold_bars), total)| SweepRow {
            timeframe,
            hold_bars,
            tickers: total.returns.len(),
            trades: total.trades,
            wins: total.wins,
            avg_return_pct: total.returns.iter().copied().sum::<Decimal>()
                / Decimal::from(total.returns.len()),
            win_rate_pct: Decimal::from(total.wins) / Decimal::from(total.trades) * dec!(100),
        })
        .collect();

    let comparison = TimeframeComparison::from_rows(&rows);
    let best = rows.iter().max_by_key(|r| r.avg_return_pct).cloned();
    info!(
        configs = rows.len(),
        skipped = skipped.len(),
        "RSI sweep complete"
    );

    Ok(SweepReport {
        rows,
        comparison,
        best,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::prelude::FromPrimitive;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn day(offset: i64) -> DateTime<Utc> {
        // 2024-01-01 is a Monday
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset)
    }

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::from_close(day(i as i64), Decimal::from_f64(c).unwrap()))
            .collect()
    }

    /// Rising with a bump every third bar, so no window is flat.
    fn trending(n: usize) -> Vec<PriceBar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + i as f64 + if i % 3 == 0 { 5.0 } else { 0.0 })
            .collect();
        bars_from(&closes)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strategy(hold_bars: usize) -> RsiStrategy {
        RsiStrategy {
            timeframe: Timeframe::Daily,
            hold_bars,
            rsi_period: 3,
            threshold: 35.0,
            initial_cash: dec!(1000),
            commission: Decimal::ZERO,
        }
    }

    fn small_params() -> RsiBacktestParams {
        RsiBacktestParams {
            rsi_period: 3,
            min_history_bars: 50,
            min_signal_bars: 20,
            ..RsiBacktestParams::default()
        }
    }

    // ============================================================
    // Resampling Tests
    // ============================================================

    #[test]
    fn weekly_period_ends_on_sunday() {
        assert_eq!(period_end(date(2024, 1, 1), Timeframe::Weekly), date(2024, 1, 7));
        assert_eq!(period_end(date(2024, 1, 5), Timeframe::Weekly), date(2024, 1, 7));
        assert_eq!(period_end(date(2024, 1, 7), Timeframe::Weekly), date(2024, 1, 7));
        assert_eq!(period_end(date(2024, 12, 30), Timeframe::Weekly), date(2025, 1, 5));
    }

    #[test]
    fn monthly_period_ends_on_last_day() {
        assert_eq!(period_end(date(2024, 2, 10), Timeframe::Monthly), date(2024, 2, 29));
        assert_eq!(period_end(date(2023, 2, 1), Timeframe::Monthly), date(2023, 2, 28));
        assert_eq!(period_end(date(2024, 12, 31), Timeframe::Monthly), date(2024, 12, 31));
    }

    #[test]
    fn daily_period_is_the_date() {
        assert_eq!(period_end(date(2024, 6, 3), Timeframe::Daily), date(2024, 6, 3));
    }

    #[test]
    fn weekly_rsi_uses_latest_completed_week() {
        // Five weeks with weekly closes 100, 110, 105, 120, 130
        let weekly_closes = [100.0, 110.0, 105.0, 120.0, 130.0];
        let closes: Vec<f64> = (0..35).map(|d| weekly_closes[d / 7]).collect();
        let bars = bars_from(&closes);

        let rsi = timeframe_rsi(&bars, Timeframe::Weekly, 2).unwrap();

        assert_eq!(rsi.len(), 35);
        // No week has ended before the first Sunday
        assert!(rsi[..13].iter().all(Option::is_none));
        // Sunday Jan 14 closes week two: gains only
        assert_eq!(rsi[13], Some(100.0));
        assert_eq!(rsi[19], Some(100.0));
        // Week three: +10, -5 => RS 2
        let week3 = rsi[20].unwrap();
        assert!((week3 - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(rsi[34], Some(100.0));
    }

    #[test]
    fn daily_rsi_matches_indicator() {
        let bars = trending(20);
        let rsi = timeframe_rsi(&bars, Timeframe::Daily, 3).unwrap();
        let expected: Vec<Option<f64>> = closes(&bars).into_iter().rsi(3).unwrap().collect();

        assert_eq!(rsi, expected);
    }

    #[test]
    fn zero_period_is_rejected() {
        let bars = trending(20);
        assert!(matches!(
            timeframe_rsi(&bars, Timeframe::Monthly, 0),
            Err(SignalError::InvalidPeriod { .. })
        ));
    }

    // ============================================================
    // Strategy Tests
    // ============================================================

    #[test]
    fn buys_next_open_and_exits_after_hold() {
        let bars = bars_from(&[
            100.0, 101.0, 102.0, 103.0, 99.0, 98.0, 97.0, 100.0, 103.0, 106.0, 109.0, 112.0,
        ]);
        let rsi: Vec<Option<f64>> = closes(&bars).into_iter().rsi(3).unwrap().collect();

        let result = run_strategy("TEST", &bars, &rsi, &strategy(2));

        // Signal on bar 4 (RSI 33.3), fill at bar 5 open 98, exit signal
        // on bar 6, fill at bar 7 open 100
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.shares, dec!(10));
        assert_eq!(trade.entry_price, dec!(98));
        assert_eq!(trade.exit_price, dec!(100));
        assert_eq!(trade.pnl, dec!(20));
        assert_eq!(trade.entry_time, day(5));
        assert_eq!(result.final_equity, dec!(1020));
        assert_eq!(result.return_pct, dec!(2));
        assert_eq!(result.win_rate_pct(), dec!(100));
    }

    #[test]
    fn commission_applies_to_both_legs() {
        let bars = bars_from(&[100.0, 100.0, 100.0, 100.0]);
        let rsi = vec![Some(10.0), Some(10.0), Some(90.0), Some(90.0)];
        let strategy = RsiStrategy {
            rsi_period: 1,
            hold_bars: 1,
            commission: dec!(0.01),
            ..strategy(1)
        };

        let result = run_strategy("TEST", &bars, &rsi, &strategy);

        let trade = &result.trades[0];
        assert_eq!(trade.entry_price, dec!(101));
        assert_eq!(trade.exit_price, dec!(99));
        assert_eq!(trade.shares, dec!(9));
        assert!(!trade.is_win());
        assert_eq!(result.final_equity, dec!(1000) - dec!(9) * dec!(2));
    }

    #[test]
    fn open_trade_is_closed_on_last_bar() {
        let bars = bars_from(&[100.0, 100.0, 110.0]);
        let rsi = vec![Some(10.0), Some(10.0), Some(10.0)];
        let strategy = RsiStrategy {
            rsi_period: 1,
            hold_bars: 50,
            ..strategy(50)
        };

        let result = run_strategy("TEST", &bars, &rsi, &strategy);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_price, dec!(110));
        assert_eq!(result.trades[0].exit_time, day(2));
        assert_eq!(result.final_equity, dec!(1100));
    }

    #[test]
    fn no_signal_no_trades() {
        let bars = trending(30);
        let rsi = vec![Some(80.0); 30];

        let result = run_strategy("TEST", &bars, &rsi, &strategy(5));

        assert!(result.trades.is_empty());
        assert_eq!(result.final_equity, dec!(1000));
        assert_eq!(result.win_rate_pct(), Decimal::ZERO);
    }

    #[test]
    fn warmup_bars_do_not_signal() {
        let bars = bars_from(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        let rsi = vec![Some(10.0); 5];
        let strategy = RsiStrategy {
            rsi_period: 4,
            ..strategy(10)
        };

        let result = run_strategy("TEST", &bars, &rsi, &strategy);

        // First signal on bar 3, filled at bar 4, closed at the end
        assert_eq!(result.trades[0].entry_time, day(4));
    }

    // ============================================================
    // Preparation Tests
    // ============================================================

    #[test]
    fn prepare_rejects_short_history() {
        let err = PreparedSeries::new("AAPL", &trending(30), &small_params()).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData { required: 50, available: 30, .. }
        ));
    }

    #[test]
    fn prepare_keeps_rows_with_all_timeframes() {
        let prepared = PreparedSeries::new("AAPL", &trending(200), &small_params()).unwrap();

        // Monthly RSI(3) first exists at the March month end
        assert_eq!(prepared.bars()[0].timestamp.date_naive(), date(2024, 3, 31));
        for tf in [Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly] {
            assert_eq!(prepared.rsi(tf).len(), prepared.bars().len());
            assert!(prepared.rsi(tf).iter().all(Option::is_some));
        }
    }

    #[test]
    fn prepare_requires_signal_rows() {
        let params = RsiBacktestParams {
            min_signal_bars: 150,
            ..small_params()
        };
        let err = PreparedSeries::new("AAPL", &trending(200), &params).unwrap_err();
        assert!(matches!(err, BacktestError::InsufficientData { required: 150, .. }));
    }

    // ============================================================
    // Sweep Tests
    // ============================================================

    #[test]
    fn sweep_configs_order() {
        assert_eq!(
            sweep_configs(&[21, 42]),
            vec![
                (Timeframe::Weekly, 21),
                (Timeframe::Weekly, 42),
                (Timeframe::Monthly, 21),
                (Timeframe::Monthly, 42),
            ]
        );
    }

    #[test]
    fn sweep_aggregates_profitable_uptrend() {
        let params = RsiBacktestParams {
            rsi_threshold: 101.0,
            hold_bars: vec![21, 42],
            ..small_params()
        };
        let series = vec![
            ("AAPL".to_string(), trending(200)),
            ("MSFT".to_string(), trending(200)),
            ("TINY".to_string(), trending(10)),
        ];

        let report = run_sweep(&series, &params).unwrap();

        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "TINY");
        for row in &report.rows {
            assert_eq!(row.tickers, 2);
            assert!(row.trades >= 2);
            assert_eq!(row.wins, row.trades);
            assert_eq!(row.win_rate_pct, dec!(100));
            assert!(row.avg_return_pct > Decimal::ZERO);
        }
        assert!(report.comparison.is_some());
        assert!(report.best.is_some());
    }

    #[test]
    fn sweep_without_signals_has_no_rows() {
        let params = RsiBacktestParams {
            rsi_threshold: 0.0,
            ..small_params()
        };
        let report = run_sweep(&[("AAPL".to_string(), trending(200))], &params).unwrap();

        assert!(report.rows.is_empty());
        assert!(report.comparison.is_none());
        assert!(report.best.is_none());
    }

    #[test]
    fn sweep_rejects_zero_hold() {
        let params = RsiBacktestParams {
            hold_bars: vec![0],
            ..small_params()
        };
        assert!(matches!(
            run_sweep(&[], &params),
            Err(BacktestError::Simulation(_))
        ));
    }

    #[test]
    fn comparison_picks_higher_average() {
        let row = |timeframe, avg_return_pct| SweepRow {
            timeframe,
            hold_bars: 21,
            tickers: 1,
            trades: 1,
            wins: 1,
            avg_return_pct,
            win_rate_pct: dec!(100),
        };
        let rows = vec![
            row(Timeframe::Weekly, dec!(4)),
            row(Timeframe::Weekly, dec!(6)),
            row(Timeframe::Monthly, dec!(8)),
        ];

        let cmp = TimeframeComparison::from_rows(&rows).unwrap();
        assert_eq!(cmp.weekly_avg_pct, dec!(5));
        assert_eq!(cmp.winner, Timeframe::Monthly);
        assert_eq!(cmp.margin_pct, dec!(3));

        assert!(TimeframeComparison::from_rows(&rows[..2]).is_none());
    }
}
