//! Main service loop: exits, scanning and execution on a fixed interval.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use theta_core::{BotConfig, BrokerClient, MarketDataProvider, StrategyConfig};
use theta_ib::{resolve_account_value, resolve_positions};
use theta_signals::EntryRules;
use tracing::{error, info, warn};

use crate::executor;
use crate::scanner;
use crate::targets;
use crate::types::CycleReport;

/// Polling put-selling bot over a market-data provider and a broker.
pub struct OptionsBot {
    provider: Arc<dyn MarketDataProvider>,
    broker: Arc<dyn BrokerClient>,
    strategy: StrategyConfig,
    settings: BotConfig,
    rules: EntryRules,
}

impl OptionsBot {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        broker: Arc<dyn BrokerClient>,
        strategy: StrategyConfig,
        settings: BotConfig,
    ) -> Self {
        let rules = EntryRules::from_strategy(&strategy);
        Self {
            provider,
            broker,
            strategy,
            settings,
            rules,
        }
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// One pass over the account:
    /// 1. Refresh marks for `today`, then resolve account value and open
    ///    positions
    /// 2. Close positions at their profit target
    /// 3. Scan for entries while under `max_positions`
    /// 4. Sell puts for new entries when `auto_execute` is set
    ///
    /// Order failures are logged and the cycle continues.
    ///
    /// # Errors
    /// Fails when the broker is connected but cannot report the account or
    /// its positions.
    pub async fn run_cycle(&self, today: NaiveDate) -> Result<CycleReport> {
        if let Err(e) = self.broker.refresh_marks(today).await {
            warn!(error = %e, "Failed to refresh position marks");
        }
        let account_value =
            resolve_account_value(self.broker.as_ref(), self.strategy.initial_capital).await?;
        let positions = resolve_positions(self.broker.as_ref()).await?;
        info!(
            account_value = %account_value.value(),
            simulated = account_value.is_simulated(),
            positions = positions.len(),
            "Cycle started"
        );

        let held: HashSet<String> = positions.iter().map(|p| p.ticker().to_string()).collect();
        let mut open_positions = positions.len();
        let mut orders = Vec::new();

        let exits = targets::check_exits(&positions, &self.strategy);
        if self.settings.auto_execute {
            for action in &exits {
                match executor::execute_exit(self.broker.as_ref(), action).await {
                    Ok(handle) => {
                        orders.push(handle);
                        open_positions = open_positions.saturating_sub(1);
                    }
                    Err(e) => error!(error = %e, "Failed to close position"),
                }
            }
        }

        let opportunities = if open_positions < self.strategy.max_positions {
            scanner::scan_opportunities(
                self.provider.as_ref(),
                &self.strategy.tickers,
                &self.rules,
                &held,
                self.settings.history_lookback_days,
            )
            .await
        } else {
            info!(
                open_positions,
                max = self.strategy.max_positions,
                "At max positions, not scanning"
            );
            Vec::new()
        };

        if self.settings.auto_execute {
            for opportunity in &opportunities {
                if open_positions >= self.strategy.max_positions {
                    info!(ticker = %opportunity.ticker, "Position limit reached, skipping entry");
                    break;
                }
                match executor::execute_trade(
                    self.broker.as_ref(),
                    opportunity,
                    &self.strategy,
                    today,
                )
                .await
                {
                    Ok(handle) => {
                        orders.push(handle);
                        open_positions += 1;
                    }
                    Err(e) => {
                        warn!(ticker = %opportunity.ticker, error = %e, "Failed to execute trade");
                    }
                }
            }
        } else if !opportunities.is_empty() {
            info!(
                count = opportunities.len(),
                "Opportunities found, auto-execute disabled"
            );
        }

        Ok(CycleReport {
            account_value,
            open_positions,
            exits,
            opportunities,
            orders,
        })
    }

    /// Runs cycles every `poll_interval_secs` until ctrl-c.
    pub async fn run(&self) -> Result<()> {
        info!(
            poll_secs = self.settings.poll_interval_secs,
            tickers = ?self.strategy.tickers,
            take_profit = %self.strategy.take_profit,
            max_positions = self.strategy.max_positions,
            auto_execute = self.settings.auto_execute,
            "Options bot started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_cycle(Utc::now().date_naive()).await {
                        Ok(report) => info!(
                            exits = report.exits.len(),
                            opportunities = report.opportunities.len(),
                            orders = report.orders.len(),
                            "Cycle complete"
                        ),
                        Err(e) => error!(error = %e, "Cycle failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested, stopping bot");
                    return Ok(());
                }
            }
        }
    }
}
