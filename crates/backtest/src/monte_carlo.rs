//! Monte Carlo capital path simulation for a premium-selling strategy.
//!
//! Each run compounds a single capital figure through `months ×
//! trades_per_month` independent trades. A winning trade keeps
//! `take_profit_fraction` of the premium collected on the position, a losing
//! one gives back `loss_fraction` of it. Capital is recorded after every
//! month, producing one [`CapitalPath`] per run.
//!
//! # Example
//!
//! ```ignore
//! use theta_backtest::monte_carlo::{MonteCarloSimulator, SimulationConfig};
//! use theta_core::SimulationParams;
//!
//! let config = SimulationConfig::new(&SimulationParams::default())?;
//! let report = MonteCarloSimulator::new(config).with_seed(42).run(1000)?;
//! println!("Mean final capital: {}", report.summary.final_capital.mean);
//! ```

use std::ops::Deref;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use theta_core::SimulationParams;
use tracing::{debug, info};

use crate::error::SimulationError;
use crate::summary::SimulationSummary;

/// Ceiling (log10) on the capital a run can reach. Keeps path and summary
/// arithmetic well inside `Decimal` range (about 7.9e28).
const MAX_CAPITAL_LOG10: f64 = 24.0;

/// Ceiling (log10) on the compounded growth factor of a run, which bounds
/// percentage returns.
const MAX_GROWTH_LOG10: f64 = 18.0;

/// Validated, immutable simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    initial_capital: Decimal,
    position_fraction: Decimal,
    win_probability: f64,
    premium_fraction: Decimal,
    take_profit_fraction: Decimal,
    loss_fraction: Decimal,
    trades_per_month: u32,
    months: u32,
    #[serde(skip)]
    win_rate: Decimal,
    #[serde(skip)]
    loss_rate: Decimal,
}

impl SimulationConfig {
    /// Validates `params` into a configuration.
    ///
    /// # Errors
    /// Returns `SimulationError::InvalidConfiguration` naming the first
    /// field outside its domain.
    pub fn new(params: &SimulationParams) -> Result<Self, SimulationError> {
        if params.initial_capital <= Decimal::ZERO {
            return Err(SimulationError::invalid(
                "initial_capital",
                format!("must be positive, got {}", params.initial_capital),
            ));
        }
        check_unit_interval("position_fraction", params.position_fraction, true)?;
        if !(0.0..=1.0).contains(&params.win_probability) {
            return Err(SimulationError::invalid(
                "win_probability",
                format!("must be within [0, 1], got {}", params.win_probability),
            ));
        }
        check_unit_interval("premium_fraction", params.premium_fraction, false)?;
        check_unit_interval("take_profit_fraction", params.take_profit_fraction, true)?;
        check_unit_interval("loss_fraction", params.loss_fraction, true)?;

        let premium_rate = params.position_fraction * params.premium_fraction;
        let win_rate = premium_rate * params.take_profit_fraction;
        check_growth(params, win_rate)?;

        Ok(Self {
            initial_capital: params.initial_capital,
            position_fraction: params.position_fraction,
            win_probability: params.win_probability,
            premium_fraction: params.premium_fraction,
            take_profit_fraction: params.take_profit_fraction,
            loss_fraction: params.loss_fraction,
            trades_per_month: params.trades_per_month,
            months: params.months,
            win_rate,
            loss_rate: premium_rate * params.loss_fraction,
        })
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn position_fraction(&self) -> Decimal {
        self.position_fraction
    }

    pub fn win_probability(&self) -> f64 {
        self.win_probability
    }

    pub fn premium_fraction(&self) -> Decimal {
        self.premium_fraction
    }

    pub fn take_profit_fraction(&self) -> Decimal {
        self.take_profit_fraction
    }

    pub fn loss_fraction(&self) -> Decimal {
        self.loss_fraction
    }

    pub fn trades_per_month(&self) -> u32 {
        self.trades_per_month
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    /// Total trades per run.
    pub fn total_trades(&self) -> u64 {
        u64::from(self.trades_per_month) * u64::from(self.months)
    }

    /// The raw parameters this configuration was built from.
    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            initial_capital: self.initial_capital,
            position_fraction: self.position_fraction,
            win_probability: self.win_probability,
            premium_fraction: self.premium_fraction,
            take_profit_fraction: self.take_profit_fraction,
            loss_fraction: self.loss_fraction,
            trades_per_month: self.trades_per_month,
            months: self.months,
        }
    }
}

impl TryFrom<&SimulationParams> for SimulationConfig {
    type Error = SimulationError;

    fn try_from(params: &SimulationParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

/// Rejects schedules whose all-win path would compound past the capital or
/// growth ceiling.
fn check_growth(params: &SimulationParams, win_rate: Decimal) -> Result<(), SimulationError> {
    let initial_log10 = params
        .initial_capital
        .to_f64()
        .map_or(f64::INFINITY, f64::log10);
    if initial_log10 > MAX_CAPITAL_LOG10 {
        return Err(SimulationError::invalid(
            "initial_capital",
            format!("must not exceed 1e{MAX_CAPITAL_LOG10}, got {}", params.initial_capital),
        ));
    }

    let trades = u64::from(params.trades_per_month) * u64::from(params.months);
    let per_trade = win_rate.to_f64().map_or(f64::INFINITY, f64::ln_1p) / std::f64::consts::LN_10;
    let growth_log10 = trades as f64 * per_trade;
    if growth_log10 > MAX_GROWTH_LOG10 || initial_log10 + growth_log10 > MAX_CAPITAL_LOG10 {
        return Err(SimulationError::invalid(
            "months",
            format!(
                "{trades} trades at {win_rate} per win can compound capital by 1e{growth_log10:.1}, \
                 limit is 1e{MAX_GROWTH_LOG10} growth and 1e{MAX_CAPITAL_LOG10} capital"
            ),
        ));
    }
    Ok(())
}

/// `(0, 1]` when `inclusive`, else `(0, 1)`.
fn check_unit_interval(
    field: &'static str,
    value: Decimal,
    inclusive: bool,
) -> Result<(), SimulationError> {
    let upper_ok = if inclusive {
        value <= Decimal::ONE
    } else {
        value < Decimal::ONE
    };
    if value > Decimal::ZERO && upper_ok {
        Ok(())
    } else {
        let bound = if inclusive { "(0, 1]" } else { "(0, 1)" };
        Err(SimulationError::invalid(
            field,
            format!("must be within {bound}, got {value}"),
        ))
    }
}

/// Month-end capital of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalPath(Vec<Decimal>);

impl CapitalPath {
    pub fn as_slice(&self) -> &[Decimal] {
        &self.0
    }

    /// True when no month ends below the previous one.
    pub fn is_non_decreasing(&self) -> bool {
        self.0.windows(2).all(|w| w[1] >= w[0])
    }

    /// True when no month ends above the previous one.
    pub fn is_non_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[1] <= w[0])
    }
}

impl Deref for CapitalPath {
    type Target = [Decimal];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Outcome of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    final_capital: Decimal,
    path: CapitalPath,
}

impl SimulationResult {
    pub fn final_capital(&self) -> Decimal {
        self.final_capital
    }

    pub fn path(&self) -> &CapitalPath {
        &self.path
    }
}

/// Simulates `run_count` independent runs on the current thread.
///
/// Run `i` draws from stream `i` of a ChaCha8 generator seeded with `seed`,
/// so the output depends only on `(config, run_count, seed)`.
///
/// # Errors
/// Returns `SimulationError::InvalidConfiguration` when `run_count` is zero.
pub fn simulate(
    config: &SimulationConfig,
    run_count: usize,
    seed: u64,
) -> Result<Vec<SimulationResult>, SimulationError> {
    check_run_count(run_count)?;
    Ok((0..run_count)
        .map(|run| simulate_run(config, &mut run_rng(seed, run)))
        .collect())
}

/// Same as [`simulate`], evaluated on the rayon thread pool.
///
/// Results are bit-identical to the sequential version and kept in run order.
///
/// # Errors
/// Returns `SimulationError::InvalidConfiguration` when `run_count` is zero.
pub fn simulate_parallel(
    config: &SimulationConfig,
    run_count: usize,
    seed: u64,
) -> Result<Vec<SimulationResult>, SimulationError> {
    check_run_count(run_count)?;
    Ok((0..run_count)
        .into_par_iter()
        .map(|run| simulate_run(config, &mut run_rng(seed, run)))
        .collect())
}

/// Simulates one run drawing from `rng`.
pub fn simulate_run<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> SimulationResult {
    let mut capital = config.initial_capital;
    if config.trades_per_month == 0 {
        return SimulationResult {
            final_capital: capital,
            path: CapitalPath::default(),
        };
    }

    let mut path = Vec::with_capacity(config.months as usize);
    for _ in 0..config.months {
        for _ in 0..config.trades_per_month {
            if rng.gen::<f64>() < config.win_probability {
                capital += capital * config.win_rate;
            } else {
                capital -= capital * config.loss_rate;
            }
        }
        path.push(capital);
    }

    SimulationResult {
        final_capital: capital,
        path: CapitalPath(path),
    }
}

fn check_run_count(run_count: usize) -> Result<(), SimulationError> {
    if run_count == 0 {
        return Err(SimulationError::invalid("run_count", "must be positive"));
    }
    Ok(())
}

fn run_rng(seed: u64, run: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(run as u64);
    rng
}

/// Results of a simulator invocation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed the runs were drawn from; pass it back to reproduce them.
    pub seed: u64,
    pub results: Vec<SimulationResult>,
    pub summary: SimulationSummary,
}

/// Runs the capital path simulation and summarises it.
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    config: SimulationConfig,
    seed: Option<u64>,
    parallel: bool,
}

impl MonteCarloSimulator {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            seed: None,
            parallel: false,
        }
    }

    /// Sets a seed for reproducible simulations.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Optional form of [`Self::with_seed`]; `None` draws a seed from entropy.
    #[must_use]
    pub fn with_optional_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulates `run_count` runs and summarises the outcome.
    ///
    /// # Errors
    /// Returns `SimulationError::InvalidConfiguration` when `run_count` is zero.
    pub fn run(&self, run_count: usize) -> Result<SimulationReport, SimulationError> {
        let seed = self
            .seed
            .unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());

        info!(
            run_count,
            seed,
            parallel = self.parallel,
            win_probability = self.config.win_probability,
            trades = self.config.total_trades(),
            "Running capital path simulation"
        );

        let results = if self.parallel {
            simulate_parallel(&self.config, run_count, seed)?
        } else {
            simulate(&self.config, run_count, seed)?
        };

        let summary = SimulationSummary::from_results(&self.config, &results);
        debug!(
            mean = %summary.final_capital.mean,
            median = %summary.final_capital.median,
            prob_profit = summary.prob_profit,
            "Simulation complete"
        );

        Ok(SimulationReport {
            seed,
            results,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn params() -> SimulationParams {
        SimulationParams::default()
    }

    fn config_with(f: impl FnOnce(&mut SimulationParams)) -> SimulationConfig {
        let mut p = params();
        f(&mut p);
        SimulationConfig::new(&p).unwrap()
    }

    fn invalid_field(p: &SimulationParams) -> &'static str {
        match SimulationConfig::new(p) {
            Err(SimulationError::InvalidConfiguration { field, .. }) => field,
            Ok(_) => panic!("expected {p:?} to be rejected"),
        }
    }

    fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
        let n = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            cov += (x - mean_x) * (y - mean_y);
            var_x += (x - mean_x).powi(2);
            var_y += (y - mean_y).powi(2);
        }
        cov / (var_x.sqrt() * var_y.sqrt())
    }

    // ============================================================
    // Configuration Tests
    // ============================================================

    #[test]
    fn default_params_are_valid() {
        let config = SimulationConfig::new(&params()).unwrap();

        assert_eq!(config.initial_capital(), dec!(50000));
        assert_eq!(config.trades_per_month(), 4);
        assert_eq!(config.months(), 36);
        assert_eq!(config.total_trades(), 144);
        assert_eq!(config.params(), params());
    }

    #[test]
    fn rejects_non_positive_capital() {
        let mut p = params();
        p.initial_capital = dec!(0);
        assert_eq!(invalid_field(&p), "initial_capital");

        p.initial_capital = dec!(-100);
        assert_eq!(invalid_field(&p), "initial_capital");
    }

    #[test]
    fn rejects_probability_outside_unit_interval() {
        let mut p = params();
        p.win_probability = 1.01;
        assert_eq!(invalid_field(&p), "win_probability");

        p.win_probability = -0.1;
        assert_eq!(invalid_field(&p), "win_probability");

        p.win_probability = f64::NAN;
        assert_eq!(invalid_field(&p), "win_probability");
    }

    #[test]
    fn accepts_probability_bounds() {
        config_with(|p| p.win_probability = 0.0);
        config_with(|p| p.win_probability = 1.0);
    }

    #[test]
    fn rejects_fractions_outside_domain() {
        let mut p = params();
        p.position_fraction = dec!(0);
        assert_eq!(invalid_field(&p), "position_fraction");

        let mut p = params();
        p.premium_fraction = dec!(1);
        assert_eq!(invalid_field(&p), "premium_fraction");

        let mut p = params();
        p.take_profit_fraction = dec!(1.5);
        assert_eq!(invalid_field(&p), "take_profit_fraction");

        let mut p = params();
        p.loss_fraction = dec!(-0.3);
        assert_eq!(invalid_field(&p), "loss_fraction");
    }

    #[test]
    fn full_position_and_take_profit_are_allowed() {
        let config = config_with(|p| {
            p.position_fraction = dec!(1);
            p.take_profit_fraction = dec!(1);
            p.loss_fraction = dec!(1);
        });
        assert_eq!(config.position_fraction(), dec!(1));
    }

    #[test]
    fn rejects_schedule_that_compounds_past_decimal_range() {
        // Near-total premium on the whole account, 96 certain wins
        let mut p = params();
        p.position_fraction = dec!(1);
        p.premium_fraction = dec!(0.99);
        p.take_profit_fraction = dec!(1);
        p.win_probability = 1.0;
        p.months = 24;
        assert_eq!(invalid_field(&p), "months");

        // Default rates over two centuries
        let mut p = params();
        p.win_probability = 1.0;
        p.months = 2400;
        assert_eq!(invalid_field(&p), "months");

        // Likely losses still leave an all-win path of 1e4 * 1.5^144
        let mut p = params();
        p.initial_capital = dec!(10000);
        p.position_fraction = dec!(1);
        p.premium_fraction = dec!(0.5);
        p.take_profit_fraction = dec!(1);
        p.loss_fraction = dec!(1);
        p.win_probability = 0.9;
        assert_eq!(invalid_field(&p), "months");
    }

    #[test]
    fn rejects_capital_above_ceiling() {
        let mut p = params();
        p.initial_capital = dec!(10_000_000_000_000_000_000_000_000);
        p.months = 0;
        assert_eq!(invalid_field(&p), "initial_capital");
    }

    #[test]
    fn largest_accepted_schedule_runs_without_overflow() {
        // 10^(18 / 4 / log10(1.99)) months is the growth limit; stay just inside
        let config = config_with(|p| {
            p.initial_capital = dec!(1_000_000);
            p.position_fraction = dec!(1);
            p.premium_fraction = dec!(0.99);
            p.take_profit_fraction = dec!(1);
            p.win_probability = 1.0;
            p.months = 15;
        });
        let results = simulate(&config, 2, 1).unwrap();
        assert!(results[0].final_capital() > dec!(1_000_000_000_000_000_000_000));
        assert!(results[0].path().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn zero_run_count_is_rejected() {
        let config = SimulationConfig::new(&params()).unwrap();
        assert!(matches!(
            simulate(&config, 0, 1),
            Err(SimulationError::InvalidConfiguration { field: "run_count", .. })
        ));
        assert!(simulate_parallel(&config, 0, 1).is_err());
    }

    // ============================================================
    // Path Shape Tests
    // ============================================================

    #[test]
    fn path_has_one_entry_per_month() {
        let config = config_with(|p| p.months = 12);
        let results = simulate(&config, 5, 7).unwrap();

        assert_eq!(results.len(), 5);
        for result in &results {
            assert_eq!(result.path().len(), 12);
            assert_eq!(result.path().last().copied(), Some(result.final_capital()));
        }
    }

    #[test]
    fn zero_months_gives_empty_path() {
        let config = config_with(|p| p.months = 0);
        let results = simulate(&config, 3, 1).unwrap();

        for result in results {
            assert!(result.path().is_empty());
            assert_eq!(result.final_capital(), dec!(50000));
        }
    }

    #[test]
    fn zero_trades_per_month_gives_empty_path() {
        let config = config_with(|p| p.trades_per_month = 0);
        let results = simulate(&config, 3, 1).unwrap();

        for result in results {
            assert!(result.path().is_empty());
            assert_eq!(result.final_capital(), dec!(50000));
        }
    }

    #[test]
    fn certain_win_paths_never_decrease() {
        let config = config_with(|p| p.win_probability = 1.0);
        let results = simulate(&config, 50, 99).unwrap();

        for result in &results {
            assert!(result.path().is_non_decreasing());
            assert!(result.final_capital() > config.initial_capital());
        }
    }

    #[test]
    fn certain_win_compounds_exactly() {
        let config = config_with(|p| {
            p.win_probability = 1.0;
            p.trades_per_month = 1;
            p.months = 2;
        });
        let result = &simulate(&config, 1, 0).unwrap()[0];

        // 50000 * 0.25 * 0.05 * 0.5 = 312.5 per trade at the starting capital
        assert_eq!(result.path()[0], dec!(50312.5));
        assert_eq!(result.final_capital(), dec!(50312.5) * dec!(1.00625));
    }

    #[test]
    fn certain_loss_paths_never_increase() {
        let config = config_with(|p| p.win_probability = 0.0);
        let results = simulate(&config, 50, 99).unwrap();

        for result in &results {
            assert!(result.path().is_non_increasing());
            assert!(result.final_capital() < config.initial_capital());
        }
    }

    #[test]
    fn certain_loss_uses_loss_fraction() {
        let config = config_with(|p| {
            p.win_probability = 0.0;
            p.trades_per_month = 1;
            p.months = 1;
        });
        let result = &simulate(&config, 1, 0).unwrap()[0];

        // 50000 * 0.25 * 0.05 * 0.3 = 187.5
        assert_eq!(result.final_capital(), dec!(49812.5));
    }

    // ============================================================
    // Reproducibility Tests
    // ============================================================

    #[test]
    fn same_seed_is_bit_identical() {
        let config = SimulationConfig::new(&params()).unwrap();

        let a = simulate(&config, 20, 12345).unwrap();
        let b = simulate(&config, 20, 12345).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let config = SimulationConfig::new(&params()).unwrap();

        let a = simulate(&config, 20, 11111).unwrap();
        let b = simulate(&config, 20, 22222).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = SimulationConfig::new(&params()).unwrap();

        let sequential = simulate(&config, 64, 2024).unwrap();
        let parallel = simulate_parallel(&config, 64, 2024).unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn runs_within_one_call_differ() {
        let config = SimulationConfig::new(&params()).unwrap();
        let results = simulate(&config, 10, 5).unwrap();

        let first = results[0].final_capital();
        assert!(results.iter().skip(1).any(|r| r.final_capital() != first));
    }

    #[test]
    fn prefix_of_runs_is_stable_across_run_counts() {
        let config = SimulationConfig::new(&params()).unwrap();

        let short = simulate(&config, 5, 77).unwrap();
        let long = simulate(&config, 50, 77).unwrap();

        assert_eq!(short[..], long[..5]);
    }

    // ============================================================
    // Statistical Tests
    // ============================================================

    #[test]
    fn run_outcomes_are_uncorrelated_across_seeds() {
        let config = config_with(|p| p.months = 12);

        let mut firsts = Vec::new();
        let mut seconds = Vec::new();
        for seed in 0..1000 {
            let results = simulate(&config, 2, seed).unwrap();
            firsts.push(results[0].final_capital().to_f64().unwrap());
            seconds.push(results[1].final_capital().to_f64().unwrap());
        }

        let r = correlation(&firsts, &seconds);
        assert!(r.abs() < 0.15, "correlation between runs was {r}");
    }

    #[test]
    fn default_scenario_roughly_doubles_capital() {
        let config = SimulationConfig::new(&params()).unwrap();
        let results = simulate(&config, 1000, 42).unwrap();

        let total: Decimal = results.iter().map(SimulationResult::final_capital).sum();
        let mean = total / Decimal::from(results.len());
        let multiple = mean / config.initial_capital();

        assert!(
            multiple > dec!(1.5) && multiple < dec!(2.5),
            "mean multiple was {multiple}"
        );
    }

    // ============================================================
    // Simulator Tests
    // ============================================================

    #[test]
    fn simulator_reports_seed_and_summary() {
        let config = SimulationConfig::new(&params()).unwrap();
        let report = MonteCarloSimulator::new(config.clone())
            .with_seed(9)
            .run(100)
            .unwrap();

        assert_eq!(report.seed, 9);
        assert_eq!(report.results, simulate(&config, 100, 9).unwrap());
        assert_eq!(report.summary.run_count, 100);
    }

    #[test]
    fn simulator_without_seed_is_reproducible_from_reported_seed() {
        let config = config_with(|p| p.months = 6);
        let report = MonteCarloSimulator::new(config.clone()).run(10).unwrap();

        let replay = MonteCarloSimulator::new(config)
            .with_optional_seed(Some(report.seed))
            .with_parallel(true)
            .run(10)
            .unwrap();

        assert_eq!(report.results, replay.results);
    }
}
