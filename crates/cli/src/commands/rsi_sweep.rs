//! Weekly/monthly RSI threshold sweep over CSV price history.

use anyhow::{bail, Result};
use clap::Args;
use theta_backtest::SweepReport;
use theta_core::AppConfig;
use theta_data::CsvPriceProvider;

use super::output::{banner, load_series, OutputFormat};

/// Arguments for the rsi-sweep command.
#[derive(Args, Debug, Clone)]
pub struct RsiSweepArgs {
    /// Directory of `<TICKER>.csv` daily bars
    #[arg(long, env = "THETA_DATA_DIR")]
    pub data_dir: String,

    /// Comma-separated tickers (defaults to `rsi.tickers`)
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Override the RSI entry threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Runs the rsi-sweep command.
///
/// # Errors
/// Returns an error for invalid parameters, an unknown format or when no
/// ticker has data.
pub async fn run_rsi_sweep(args: RsiSweepArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let mut params = config.rsi.clone();
    if let Some(tickers) = args.tickers {
        params.tickers = tickers;
    }
    if let Some(threshold) = args.threshold {
        params.rsi_threshold = threshold;
    }

    let provider = CsvPriceProvider::new(&args.data_dir);
    let series = load_series(&provider, &params.tickers, params.lookback_days).await;
    if series.is_empty() {
        bail!("No price history found in {} for {:?}", args.data_dir, params.tickers);
    }

    let report = theta_backtest::run_sweep(&series, &params)?;
    format.emit(&report, format_text_report)
}

fn format_text_report(report: &SweepReport) -> String {
    let mut output = banner("RSI THRESHOLD SWEEP");
    output.push_str(&format!(
        "{:<10} {:>6} {:>8} {:>8} {:>12} {:>10}\n",
        "Timeframe", "Hold", "Tickers", "Trades", "Avg Return", "Win Rate"
    ));
    output.push_str(&format!("{}\n", "-".repeat(59)));

    for row in &report.rows {
        output.push_str(&format!(
            "{:<10} {:>6} {:>8} {:>8} {:>12} {:>10}\n",
            row.timeframe.to_string(),
            row.hold_bars,
            row.tickers,
            row.trades,
            format!("{:.2}%", row.avg_return_pct),
            format!("{:.1}%", row.win_rate_pct)
        ));
    }
    if report.rows.is_empty() {
        output.push_str("No configuration produced a trade\n");
    }

    if let Some(cmp) = &report.comparison {
        output.push_str(&format!(
            "\nWeekly avg {:.2}% vs monthly avg {:.2}%: {} wins by {:.2}%\n",
            cmp.weekly_avg_pct, cmp.monthly_avg_pct, cmp.winner, cmp.margin_pct
        ));
    }
    if let Some(best) = &report.best {
        output.push_str(&format!(
            "Best: {} hold {} ({:.2}%)\n",
            best.timeframe, best.hold_bars, best.avg_return_pct
        ));
    }
    if !report.skipped.is_empty() {
        output.push_str(&format!("Skipped {} tickers\n", report.skipped.len()));
    }
    output
}
