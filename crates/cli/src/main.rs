use clap::{Parser, Subcommand};
use theta_core::ConfigLoader;

mod commands;

use commands::{BotArgs, HistoricalArgs, RsiSweepArgs, ScenariosArgs, SimulateArgs};

#[derive(Parser)]
#[command(name = "theta")]
#[command(about = "Options-selling capital simulator, backtests and paper bot", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monte Carlo simulation of the capital path
    Simulate(SimulateArgs),
    /// Compare win-rate/premium scenarios
    Scenarios(ScenariosArgs),
    /// Red-day put-selling backtest over CSV history
    Historical(HistoricalArgs),
    /// Weekly vs monthly RSI threshold sweep over CSV history
    RsiSweep(RsiSweepArgs),
    /// Run the put-selling bot against CSV prices
    Bot(BotArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Commands::Simulate(args) => commands::run_simulate(args, &config)?,
        Commands::Scenarios(args) => commands::run_scenarios_command(args, &config)?,
        Commands::Historical(args) => commands::run_historical_command(args, &config).await?,
        Commands::RsiSweep(args) => commands::run_rsi_sweep(args, &config).await?,
        Commands::Bot(args) => commands::run_bot(args, &config).await?,
    }

    Ok(())
}
