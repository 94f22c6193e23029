//! Monte Carlo capital path simulation command.

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;
use theta_backtest::{MonteCarloSimulator, SimulationConfig, SimulationReport};
use theta_core::AppConfig;

use super::output::{banner, OutputFormat};

/// Arguments for the simulate command.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of runs (defaults to `monte_carlo.runs`)
    #[arg(long)]
    pub runs: Option<usize>,

    /// Seed for reproducible runs (defaults to `monte_carlo.seed`, else entropy)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the per-trade win probability
    #[arg(long)]
    pub win_probability: Option<f64>,

    /// Override the horizon in months
    #[arg(long)]
    pub months: Option<u32>,

    /// Evaluate runs on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Runs the simulate command.
///
/// # Errors
/// Returns an error for invalid simulation parameters or output format.
pub fn run_simulate(args: SimulateArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;

    let mut params = config.simulation.clone();
    if let Some(p) = args.win_probability {
        params.win_probability = p;
    }
    if let Some(m) = args.months {
        params.months = m;
    }

    let simulator = MonteCarloSimulator::new(SimulationConfig::new(&params)?)
        .with_optional_seed(args.seed.or(config.monte_carlo.seed))
        .with_parallel(args.parallel || config.monte_carlo.parallel);
    let report = simulator.run(args.runs.unwrap_or(config.monte_carlo.runs))?;

    match format {
        OutputFormat::Text => println!("{}", format_text_report(simulator.config(), &report)),
        // Per-run paths are large; the summary carries the mean path
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "seed": report.seed,
                "config": simulator.config(),
                "summary": report.summary,
            }))?
        ),
    }
    Ok(())
}

fn format_text_report(config: &SimulationConfig, report: &SimulationReport) -> String {
    let summary = &report.summary;
    let finals = &summary.final_capital;
    let mut output = banner("CAPITAL PATH SIMULATION");

    output.push_str(&format!("Seed:             {}\n", report.seed));
    output.push_str(&format!("Runs:             {}\n", summary.run_count));
    output.push_str(&format!("Initial Capital:  ${:.2}\n", config.initial_capital()));
    output.push_str(&format!(
        "Position Size:    {:.0}%\n",
        config.position_fraction() * Decimal::ONE_HUNDRED
    ));
    output.push_str(&format!(
        "Win Probability:  {:.0}%\n",
        config.win_probability() * 100.0
    ));
    output.push_str(&format!(
        "Premium:          {:.1}%  (take profit {:.0}%, loss {:.0}%)\n",
        config.premium_fraction() * Decimal::ONE_HUNDRED,
        config.take_profit_fraction() * Decimal::ONE_HUNDRED,
        config.loss_fraction() * Decimal::ONE_HUNDRED
    ));
    output.push_str(&format!(
        "Schedule:         {} trades/month for {} months\n",
        config.trades_per_month(),
        config.months()
    ));

    output.push_str("\n--- Final Capital ---\n");
    output.push_str(&format!("Mean:             ${:.2}\n", finals.mean));
    output.push_str(&format!("Median:           ${:.2}\n", finals.median));
    output.push_str(&format!("Std Dev:          ${:.2}\n", finals.std_dev));
    output.push_str(&format!("5th Percentile:   ${:.2}\n", finals.percentile(5.0)));
    output.push_str(&format!("95th Percentile:  ${:.2}\n", finals.percentile(95.0)));
    output.push_str(&format!("Range:            ${:.2} - ${:.2}\n", finals.min, finals.max));

    output.push_str("\n--- Returns ---\n");
    output.push_str(&format!(
        "Total (mean):     {:.1}%\n",
        summary.total_return.mean_pct
    ));
    output.push_str(&format!(
        "Total (median):   {:.1}%\n",
        summary.total_return.median_pct
    ));
    if let Some(annual) = &summary.annualized_return {
        output.push_str(&format!("Annualized:       {:.1}%\n", annual.mean_pct));
    }
    if let Some(monthly) = &summary.monthly_return {
        output.push_str(&format!("Monthly:          {:.2}%\n", monthly.mean_pct));
    }
    output.push_str(&format!(
        "Best / Worst:     {:.1}% / {:.1}%\n",
        summary.best_return_pct, summary.worst_return_pct
    ));
    output.push_str(&format!(
        "P(profit):        {:.1}%\n",
        summary.prob_profit * 100.0
    ));
    output.push_str(&format!(
        "P(2x):            {:.1}%\n",
        summary.prob_double * 100.0
    ));

    if !summary.mean_path.is_empty() {
        output.push_str("\n--- Mean Capital by Year ---\n");
        for (i, capital) in summary.mean_path.iter().enumerate() {
            let month = i + 1;
            if month % 12 == 0 || month == summary.mean_path.len() {
                output.push_str(&format!("Month {month:>3}:        ${capital:.2}\n"));
            }
        }
    }

    if let Some(target) = summary.monthly_target() {
        output.push_str(&format!("\n5% monthly target: {target}\n"));
    }
    output
}
