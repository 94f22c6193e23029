//! Red-day premium backtest over CSV price history.

use anyhow::{bail, Result};
use clap::Args;
use theta_backtest::{run_historical, HistoricalSummary};
use theta_core::AppConfig;
use theta_data::CsvPriceProvider;

use super::output::{banner, load_series, OutputFormat};

/// Arguments for the historical command.
#[derive(Args, Debug, Clone)]
pub struct HistoricalArgs {
    /// Directory of `<TICKER>.csv` daily bars
    #[arg(long, env = "THETA_DATA_DIR")]
    pub data_dir: String,

    /// Comma-separated tickers (defaults to `historical.tickers`)
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Seed for the volatility and outcome draws
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Runs the historical command.
///
/// # Errors
/// Returns an error for invalid parameters, an unknown format or when no
/// ticker has data.
pub async fn run_historical_command(args: HistoricalArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let mut params = config.historical.clone();
    if let Some(tickers) = args.tickers {
        params.tickers = tickers;
    }

    let provider = CsvPriceProvider::new(&args.data_dir);
    let series = load_series(&provider, &params.tickers, params.lookback_days).await;
    if series.is_empty() {
        bail!("No price history found in {} for {:?}", args.data_dir, params.tickers);
    }

    let summary = run_historical(&series, &params, args.seed)?;
    format.emit(&summary, format_text_report)
}

fn format_text_report(summary: &HistoricalSummary) -> String {
    let mut output = banner("RED-DAY PUT SELLING BACKTEST");
    output.push_str(&format!(
        "{:<8} {:>8} {:>8} {:>16} {:>10}\n",
        "Ticker", "Trades", "Wins", "Final", "Return"
    ));
    output.push_str(&format!("{}\n", "-".repeat(54)));

    for result in &summary.results {
        output.push_str(&format!(
            "{:<8} {:>8} {:>8} {:>16} {:>10}\n",
            result.ticker,
            result.trade_count(),
            result.win_count(),
            format!("${:.2}", result.final_capital),
            format!("{:.1}%", result.total_return_pct)
        ));
    }
    for (ticker, reason) in &summary.skipped {
        output.push_str(&format!("{ticker:<8} skipped: {reason}\n"));
    }

    output.push_str(&format!("\nTotal Trades:     {}\n", summary.total_trades));
    output.push_str(&format!(
        "Average Return:   {:.1}%\n",
        summary.average_return_pct
    ));
    output.push_str(&format!(
        "Monthly Average:  {:.2}% ({})\n",
        summary.monthly_average_pct,
        summary.monthly_target()
    ));
    if let Some((ticker, ret)) = &summary.best {
        output.push_str(&format!("Best:             {ticker} {ret:.1}%\n"));
    }
    if let Some((ticker, ret)) = &summary.worst {
        output.push_str(&format!("Worst:            {ticker} {ret:.1}%\n"));
    }
    output
}
