//! Shared output and data-loading helpers for the report commands.

use anyhow::{anyhow, Result};
use serde::Serialize;
use theta_core::{MarketDataProvider, PriceBar};
use tracing::warn;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }

    /// Prints `report` as JSON or through `text`.
    pub fn emit<T: Serialize>(self, report: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        match self {
            OutputFormat::Text => println!("{}", text(report)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        }
        Ok(())
    }
}

/// Loads price history for every ticker; missing or unreadable files are
/// logged and left out.
pub async fn load_series(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
    lookback_days: u32,
) -> Vec<(String, Vec<PriceBar>)> {
    let mut series = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.to_uppercase();
        match provider.get_price_history(&ticker, lookback_days).await {
            Ok(bars) => series.push((ticker, bars)),
            Err(e) => warn!(ticker = %ticker, error = %e, "Skipping ticker without data"),
        }
    }
    series
}

pub(crate) fn banner(title: &str) -> String {
    let rule = "===============================================================";
    format!("\n{rule}\n{title:^63}\n{rule}\n")
}
