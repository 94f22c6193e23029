//! Scans the watchlist for put-selling entries.

use std::collections::HashSet;

use theta_core::MarketDataProvider;
use theta_signals::EntryRules;
use tracing::{debug, info, warn};

use crate::types::Opportunity;

/// Evaluates the entry rules on every ticker not already held.
///
/// Data and indicator failures are logged and the ticker is skipped; they
/// never abort the scan.
pub async fn scan_opportunities(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
    rules: &EntryRules,
    held: &HashSet<String>,
    lookback_days: u32,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    for ticker in tickers {
        let ticker = ticker.to_uppercase();
        if held.contains(&ticker) {
            debug!(ticker = %ticker, "Already holding a position, skipping");
            continue;
        }

        let bars = match provider.get_price_history(&ticker, lookback_days).await {
            Ok(bars) => bars,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Failed to fetch price history");
                continue;
            }
        };

        let snapshot = match rules.snapshot(&ticker, &bars) {
            Ok(s) => s,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "Cannot evaluate entry rules");
                continue;
            }
        };

        if let Some(signal) = rules.evaluate(&snapshot) {
            info!(
                ticker = %ticker,
                price = %snapshot.price,
                rsi = ?snapshot.rsi,
                %signal,
                "Entry opportunity"
            );
            opportunities.push(Opportunity::from_snapshot(&snapshot, signal));
        }
    }

    opportunities
}
