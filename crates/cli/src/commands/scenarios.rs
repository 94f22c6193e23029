//! Win-rate/premium scenario sweep command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use theta_backtest::{run_scenarios, standard_scenarios, ScenarioOutcome};
use theta_core::AppConfig;

use super::output::{banner, OutputFormat};

/// Seed used when neither the flag nor the config provides one.
const DEFAULT_SCENARIO_SEED: u64 = 42;

/// Arguments for the scenarios command.
#[derive(Args, Debug, Clone)]
pub struct ScenariosArgs {
    /// Runs per scenario (defaults to `monte_carlo.scenario_runs`)
    #[arg(long)]
    pub runs: Option<usize>,

    /// Base seed; scenario i uses seed + i
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    seed: u64,
    runs: usize,
    outcomes: Vec<ScenarioOutcome>,
}

/// Runs the scenarios command.
///
/// # Errors
/// Returns an error for invalid base parameters or output format.
pub fn run_scenarios_command(args: ScenariosArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let seed = args
        .seed
        .or(config.monte_carlo.seed)
        .unwrap_or(DEFAULT_SCENARIO_SEED);
    let runs = args.runs.unwrap_or(config.monte_carlo.scenario_runs);

    let outcomes = run_scenarios(&config.simulation, &standard_scenarios(), runs, seed)?;
    let report = ScenarioReport {
        seed,
        runs,
        outcomes,
    };
    format.emit(&report, format_text_report)
}

fn format_text_report(report: &ScenarioReport) -> String {
    let mut output = banner("SCENARIO ANALYSIS");
    output.push_str(&format!(
        "Seed: {}   Runs per scenario: {}\n\n",
        report.seed, report.runs
    ));
    output.push_str(&format!(
        "{:<22} {:>16} {:>12} {:>12}\n",
        "Scenario", "Mean Final", "Return", "Annual"
    ));
    output.push_str(&format!("{}\n", "-".repeat(65)));

    for outcome in &report.outcomes {
        let annual = outcome
            .annualized_pct
            .map(|a| format!("{a:.1}%"))
            .unwrap_or_else(|| "N/A".to_string());
        output.push_str(&format!(
            "{:<22} {:>16} {:>12} {:>12}\n",
            outcome.name,
            format!("${:.2}", outcome.mean_final_capital),
            format!("{:.1}%", outcome.return_pct),
            annual
        ));
    }

    let losing: Vec<&str> = report
        .outcomes
        .iter()
        .filter(|o| !o.is_profitable())
        .map(|o| o.name.as_str())
        .collect();
    if !losing.is_empty() {
        output.push_str(&format!("\nUnprofitable: {}\n", losing.join(", ")));
    }
    output
}
