//! Named market scenarios run through the capital path simulator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use theta_core::SimulationParams;
use tracing::info;

use crate::error::SimulationError;
use crate::monte_carlo::{simulate, SimulationConfig, SimulationResult};
use crate::summary::mean_decimal;

/// A win-rate and premium assumption layered over a base configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub win_probability: f64,
    pub premium_fraction: Decimal,
}

impl Scenario {
    pub fn new(name: impl Into<String>, win_probability: f64, premium_fraction: Decimal) -> Self {
        Self {
            name: name.into(),
            win_probability,
            premium_fraction,
        }
    }

    /// `base` with this scenario's win rate and premium.
    pub fn apply(&self, base: &SimulationParams) -> SimulationParams {
        SimulationParams {
            win_probability: self.win_probability,
            premium_fraction: self.premium_fraction,
            ..base.clone()
        }
    }
}

/// Optimistic through crash conditions.
pub fn standard_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("Perfect (95% win)", 0.95, dec!(0.06)),
        Scenario::new("His Claim (85% win)", 0.85, dec!(0.05)),
        Scenario::new("Bear Market (70% win)", 0.70, dec!(0.05)),
        Scenario::new("Crash (50% win)", 0.50, dec!(0.07)),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub runs: usize,
    pub mean_final_capital: Decimal,
    /// Return of the mean final capital over the horizon.
    pub return_pct: Decimal,
    /// `return_pct` spread evenly over the years. `None` for a zero-month horizon.
    pub annualized_pct: Option<Decimal>,
}

impl ScenarioOutcome {
    pub fn is_profitable(&self) -> bool {
        self.return_pct > Decimal::ZERO
    }
}

/// Runs every scenario over `base`, `runs` times each.
///
/// Scenario `i` is seeded with `seed + i` so adding a scenario does not
/// change the draws of the ones before it.
///
/// # Errors
/// Returns `SimulationError::InvalidConfiguration` if a scenario produces an
/// invalid configuration or `runs` is zero.
pub fn run_scenarios(
    base: &SimulationParams,
    scenarios: &[Scenario],
    runs: usize,
    seed: u64,
) -> Result<Vec<ScenarioOutcome>, SimulationError> {
    scenarios
        .iter()
        .zip(0u64..)
        .map(|(scenario, offset)| {
            let config = SimulationConfig::new(&scenario.apply(base))?;
            let results = simulate(&config, runs, seed.wrapping_add(offset))?;
            let outcome = outcome(scenario, &config, &results);
            info!(
                scenario = %outcome.name,
                return_pct = %outcome.return_pct.round_dp(1),
                "Scenario complete"
            );
            Ok(outcome)
        })
        .collect()
}

fn outcome(
    scenario: &Scenario,
    config: &SimulationConfig,
    results: &[SimulationResult],
) -> ScenarioOutcome {
    let initial = config.initial_capital();
    let finals: Vec<Decimal> = results.iter().map(SimulationResult::final_capital).collect();
    let mean = mean_decimal(&finals);
    let return_pct = (mean - initial) / initial * dec!(100);

    let years = Decimal::from(config.months()) / dec!(12);
    let annualized_pct = (!years.is_zero()).then(|| return_pct / years);

    ScenarioOutcome {
        name: scenario.name.clone(),
        runs: results.len(),
        mean_final_capital: mean,
        return_pct,
        annualized_pct,
    }
}
