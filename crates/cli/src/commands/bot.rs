//! Put-selling bot command.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use theta_core::{AppConfig, BrokerClient};
use theta_data::CsvPriceProvider;
use theta_ib::{OfflineBroker, PaperBroker};
use theta_options_manager::{CycleReport, OptionsBot};
use tracing::{info, warn};

use super::output::{banner, OutputFormat};

/// Arguments for the bot command.
#[derive(Args, Debug, Clone)]
pub struct BotArgs {
    /// Directory of `<TICKER>.csv` daily bars
    #[arg(long, env = "THETA_DATA_DIR")]
    pub data_dir: String,

    /// Run without a broker: simulated account value, no orders
    #[arg(long)]
    pub offline: bool,

    /// Place orders for opportunities (overrides `bot.auto_execute`)
    #[arg(long)]
    pub auto_execute: bool,

    /// Run a single cycle and print its report
    #[arg(long)]
    pub once: bool,

    /// Output format for `--once`: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Runs the bot command.
///
/// # Errors
/// Returns an error for an unknown format or a failed single cycle.
pub async fn run_bot(args: BotArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;

    let broker: Arc<dyn BrokerClient> = if args.offline {
        Arc::new(OfflineBroker)
    } else if config.broker.paper {
        info!(
            starting_cash = %config.strategy.initial_capital,
            "Using in-memory paper broker"
        );
        Arc::new(PaperBroker::new(config.strategy.initial_capital))
    } else {
        warn!(
            gateway = %config.broker.connection_url(),
            "Live gateway sessions are not supported, running offline"
        );
        Arc::new(OfflineBroker)
    };

    let mut settings = config.bot.clone();
    settings.auto_execute |= args.auto_execute;

    let bot = OptionsBot::new(
        Arc::new(CsvPriceProvider::new(&args.data_dir)),
        broker,
        config.strategy.clone(),
        settings,
    );

    if args.once {
        let report = bot.run_cycle(Utc::now().date_naive()).await?;
        return format.emit(&report, format_text_report);
    }
    bot.run().await
}

fn format_text_report(report: &CycleReport) -> String {
    let mut output = banner("BOT CYCLE");
    let source = if report.account_value.is_simulated() {
        "simulated"
    } else {
        "broker"
    };
    output.push_str(&format!(
        "Account Value:    ${:.2} ({source})\n",
        report.account_value.value()
    ));
    output.push_str(&format!("Open Positions:   {}\n", report.open_positions));

    if !report.exits.is_empty() {
        output.push_str("\n--- Exits ---\n");
        for exit in &report.exits {
            let theta_options_manager::ExitAction::Close {
                contract,
                quantity,
                reason,
            } = exit;
            output.push_str(&format!(
                "{} x{quantity} ({reason})\n",
                contract.display_name()
            ));
        }
    }

    output.push_str("\n--- Opportunities ---\n");
    if report.opportunities.is_empty() {
        output.push_str("None\n");
    }
    for opp in &report.opportunities {
        let rsi = opp
            .rsi
            .map(|r| format!("{r:.1}"))
            .unwrap_or_else(|| "N/A".to_string());
        output.push_str(&format!(
            "{:<6} ${:.2}  RSI {rsi}  {}  {}\n",
            opp.ticker, opp.price, opp.trend, opp.signal
        ));
    }

    if !report.orders.is_empty() {
        output.push_str("\n--- Orders ---\n");
        for order in &report.orders {
            output.push_str(&format!(
                "{} {:?} {} x{} @ ${:.2}\n",
                order.order_id,
                order.side,
                order.contract.display_name(),
                order.quantity,
                order.avg_fill_price
            ));
        }
    }
    output
}
