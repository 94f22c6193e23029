//! Reductions over simulated runs.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::monte_carlo::{SimulationConfig, SimulationResult};

/// Summary statistics for a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub min: Decimal,
    pub max: Decimal,
    pub mean: Decimal,
    /// Median value (50th percentile).
    pub median: Decimal,
    /// Population standard deviation.
    pub std_dev: Decimal,
    /// Key percentiles (5th, 10th, 25th, 50th, 75th, 90th, 95th).
    pub percentiles: Vec<(f64, Decimal)>,
}

impl DistributionSummary {
    /// Creates a summary from a slice of values.
    #[must_use]
    pub fn from_values(values: &[Decimal]) -> Self {
        if values.is_empty() {
            return Self::empty();
        }

        let mut sorted = values.to_vec();
        sorted.sort();

        let n = sorted.len();
        let mean = mean_decimal(&sorted);

        let median = percentile_decimal(&sorted, 0.50);
        let percentiles = [0.05, 0.10, 0.25, 0.50, 0.75, 0.90, 0.95]
            .into_iter()
            .map(|p| (p, percentile_decimal(&sorted, p)))
            .collect();

        Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
            std_dev: population_std_dev(&sorted, mean),
            percentiles,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Decimal::ZERO,
            max: Decimal::ZERO,
            mean: Decimal::ZERO,
            median: Decimal::ZERO,
            std_dev: Decimal::ZERO,
            percentiles: vec![],
        }
    }

    /// Looks up a stored percentile, falling back to the median.
    pub fn percentile(&self, p: f64) -> Decimal {
        self.percentiles
            .iter()
            .find(|(pct, _)| (*pct - p).abs() < 0.001)
            .map_or(self.median, |(_, value)| *value)
    }
}

/// Mean and median of a percentage return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStats {
    pub mean_pct: Decimal,
    pub median_pct: Decimal,
}

impl ReturnStats {
    fn scaled(self, divisor: Decimal) -> Self {
        Self {
            mean_pct: self.mean_pct / divisor,
            median_pct: self.median_pct / divisor,
        }
    }
}

/// How the mean monthly return compares with the 5–10% monthly target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthlyTarget {
    Achieved,
    Close,
    Below,
}

impl MonthlyTarget {
    pub fn assess(monthly_pct: Decimal) -> Self {
        if monthly_pct >= dec!(5) {
            Self::Achieved
        } else if monthly_pct >= dec!(3) {
            Self::Close
        } else {
            Self::Below
        }
    }
}

impl std::fmt::Display for MonthlyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Achieved => write!(f, "achieves target"),
            Self::Close => write!(f, "close to target"),
            Self::Below => write!(f, "below target"),
        }
    }
}

/// Aggregate view of a Monte Carlo invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub run_count: usize,
    pub initial_capital: Decimal,
    pub final_capital: DistributionSummary,
    /// Return over the whole horizon.
    pub total_return: ReturnStats,
    /// Simple (non-compounded) per-year return. `None` for a zero-month horizon.
    pub annualized_return: Option<ReturnStats>,
    /// Simple per-month return. `None` for a zero-month horizon.
    pub monthly_return: Option<ReturnStats>,
    /// Best single-run total return.
    pub best_return_pct: Decimal,
    /// Worst single-run total return.
    pub worst_return_pct: Decimal,
    /// Fraction of runs ending above the initial capital.
    pub prob_profit: f64,
    /// Fraction of runs ending at or above twice the initial capital.
    pub prob_double: f64,
    /// Mean capital at the end of each month across runs.
    pub mean_path: Vec<Decimal>,
}

impl SimulationSummary {
    #[must_use]
    pub fn from_results(config: &SimulationConfig, results: &[SimulationResult]) -> Self {
        let initial = config.initial_capital();
        let run_count = results.len();

        let finals: Vec<Decimal> = results.iter().map(SimulationResult::final_capital).collect();
        let final_capital = DistributionSummary::from_values(&finals);

        let returns: Vec<Decimal> = finals
            .iter()
            .map(|&capital| (capital - initial) / initial * dec!(100))
            .collect();
        let return_dist = DistributionSummary::from_values(&returns);
        let total_return = ReturnStats {
            mean_pct: return_dist.mean,
            median_pct: return_dist.median,
        };

        let months = Decimal::from(config.months());
        let (annualized_return, monthly_return) = if months.is_zero() {
            (None, None)
        } else {
            (
                Some(total_return.scaled(months / dec!(12))),
                Some(total_return.scaled(months)),
            )
        };

        let ratio = |count: usize| {
            if run_count == 0 {
                0.0
            } else {
                count as f64 / run_count as f64
            }
        };
        let profit_count = finals.iter().filter(|&&c| c > initial).count();
        let double_count = finals.iter().filter(|&&c| c >= initial * dec!(2)).count();

        Self {
            run_count,
            initial_capital: initial,
            final_capital,
            total_return,
            annualized_return,
            monthly_return,
            best_return_pct: return_dist.max,
            worst_return_pct: return_dist.min,
            prob_profit: ratio(profit_count),
            prob_double: ratio(double_count),
            mean_path: mean_path(results),
        }
    }

    /// Target assessment of the mean monthly return.
    pub fn monthly_target(&self) -> Option<MonthlyTarget> {
        self.monthly_return
            .map(|stats| MonthlyTarget::assess(stats.mean_pct))
    }
}

fn mean_path(results: &[SimulationResult]) -> Vec<Decimal> {
    let Some(first) = results.first() else {
        return Vec::new();
    };
    (0..first.path().len())
        .map(|month| {
            let column: Vec<Decimal> = results.iter().map(|r| r.path()[month]).collect();
            mean_decimal(&column)
        })
        .collect()
}

/// Arithmetic mean. Accumulates in `f64` when the exact sum leaves
/// `Decimal` range.
pub(crate) fn mean_decimal(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    match values
        .iter()
        .try_fold(Decimal::ZERO, |acc, &x| acc.checked_add(x))
    {
        Some(sum) => sum / Decimal::from(values.len()),
        None => {
            let sum: f64 = values.iter().map(|x| x.to_f64().unwrap_or_default()).sum();
            decimal_from_f64(sum / values.len() as f64)
        }
    }
}

/// Population standard deviation around `mean`, with the same `f64`
/// fallback as [`mean_decimal`] when squared deviations overflow.
fn population_std_dev(values: &[Decimal], mean: Decimal) -> Decimal {
    let n = values.len();
    let exact = values.iter().try_fold(Decimal::ZERO, |acc, &x| {
        let diff = x.checked_sub(mean)?;
        acc.checked_add(diff.checked_mul(diff)?)
    });
    match exact {
        Some(sum_sq) => decimal_sqrt(sum_sq / Decimal::from(n)),
        None => {
            let mean = mean.to_f64().unwrap_or_default();
            let variance = values
                .iter()
                .map(|x| (x.to_f64().unwrap_or_default() - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            decimal_from_f64(variance.sqrt())
        }
    }
}

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(if value.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

/// Calculates a percentile from a sorted slice of Decimal values.
pub(crate) fn percentile_decimal(sorted: &[Decimal], p: f64) -> Decimal {
    match sorted {
        [] => Decimal::ZERO,
        [only] => *only,
        _ => {
            let n = sorted.len();
            let idx = (p * (n - 1) as f64).round() as usize;
            sorted[idx.min(n - 1)]
        }
    }
}

/// Approximates square root for Decimal using Newton-Raphson method.
fn decimal_sqrt(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut guess = x
        .to_f64()
        .and_then(|f| Decimal::from_f64(f.sqrt()))
        .filter(|g| !g.is_zero())
        .unwrap_or(dec!(1));

    for _ in 0..40 {
        let next = (guess + x / guess) / dec!(2);
        if (next - guess).abs() < dec!(0.0000001) {
            return next;
        }
        guess = next;
    }

    guess
}
