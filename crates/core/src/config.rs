use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration. Every section falls back to its defaults, so a
/// partial `Config.toml` is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationParams,
    pub monte_carlo: MonteCarloSettings,
    pub strategy: StrategyConfig,
    pub broker: BrokerConfig,
    pub bot: BotConfig,
    pub historical: HistoricalParams,
    pub rsi: RsiBacktestParams,
}

/// Raw parameters of the capital path simulator. Validated into a
/// `SimulationConfig` by the backtest crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub initial_capital: Decimal,
    /// Fraction of current capital committed per trade.
    pub position_fraction: Decimal,
    pub win_probability: f64,
    /// Premium collected as a fraction of the position.
    pub premium_fraction: Decimal,
    /// Fraction of the premium kept on a winning trade.
    pub take_profit_fraction: Decimal,
    /// Fraction of the premium lost on a losing trade.
    pub loss_fraction: Decimal,
    pub trades_per_month: u32,
    pub months: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(50_000),
            position_fraction: Decimal::new(25, 2),
            win_probability: 0.85,
            premium_fraction: Decimal::new(5, 2),
            take_profit_fraction: Decimal::new(50, 2),
            loss_fraction: Decimal::new(30, 2),
            trades_per_month: 4,
            months: 36,
        }
    }
}

/// Run-count and seeding for Monte Carlo commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSettings {
    pub runs: usize,
    /// Runs per scenario in a scenario sweep.
    pub scenario_runs: usize,
    /// Fixed seed for reproducible output. Entropy when absent.
    pub seed: Option<u64>,
    /// Evaluate runs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            runs: 1000,
            scenario_runs: 100,
            seed: None,
            parallel: false,
        }
    }
}

/// Live option-selling rules used by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub tickers: Vec<String>,
    pub dte_target: u32,
    /// Premium target as a fraction of the position.
    pub premium_target: Decimal,
    /// Close once this fraction of the entry premium is captured.
    pub take_profit: Decimal,
    pub position_fraction: Decimal,
    pub max_positions: usize,
    pub rsi_period: usize,
    /// Enter only when RSI is below this level.
    pub rsi_entry: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
    /// Strike distance below spot for sold puts.
    pub otm_fraction: Decimal,
    /// Account value assumed when no broker session exists.
    pub initial_capital: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            tickers: ["TQQQ", "SOXL", "NVDL", "TSLL", "TNA", "QQQ"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            dte_target: 30,
            premium_target: Decimal::new(5, 2),
            take_profit: Decimal::new(50, 2),
            position_fraction: Decimal::new(25, 2),
            max_positions: 4,
            rsi_period: 14,
            rsi_entry: 50.0,
            ema_fast: 9,
            ema_slow: 21,
            otm_fraction: Decimal::new(5, 2),
            initial_capital: Decimal::from(50_000),
        }
    }
}

/// Broker gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Gateway/TWS host (use 127.0.0.1, TWS may block IPv6).
    pub host: String,
    /// 7497 = TWS paper, 7496 = TWS live.
    pub port: u16,
    pub client_id: i32,
    /// Route orders to the in-memory paper broker instead of a gateway.
    pub paper: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7497,
            client_id: 1,
            paper: true,
        }
    }
}

impl BrokerConfig {
    pub fn paper() -> Self {
        Self::default()
    }

    pub fn live() -> Self {
        Self {
            port: 7496,
            paper: false,
            ..Self::default()
        }
    }

    pub fn connection_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Polling bot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub poll_interval_secs: u64,
    /// Place orders for opportunities instead of only reporting them.
    pub auto_execute: bool,
    pub history_lookback_days: u32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            auto_execute: false,
            history_lookback_days: 365,
        }
    }
}

/// Red-day premium approximation over historical prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalParams {
    pub tickers: Vec<String>,
    pub lookback_days: u32,
    pub initial_capital: Decimal,
    pub position_fraction: Decimal,
    pub dte_target: u32,
    /// Skip entries whose premium is below this fraction of the position.
    pub min_premium_return: f64,
    pub iv_low: f64,
    pub iv_high: f64,
    /// Scale in `iv * sqrt(dte / 365) * scale`.
    pub premium_scale: f64,
    pub win_probability: f64,
    /// Loss on assignment as a fraction of the position (strike breached).
    pub itm_loss_fraction: Decimal,
    pub warmup_bars: usize,
    pub min_bars: usize,
}

impl Default for HistoricalParams {
    fn default() -> Self {
        Self {
            tickers: ["AMZU", "NVDL", "SOXL", "IREN", "BITX"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            lookback_days: 365,
            initial_capital: Decimal::from(50_000),
            position_fraction: Decimal::new(25, 2),
            dte_target: 30,
            min_premium_return: 0.02,
            iv_low: 0.4,
            iv_high: 0.8,
            premium_scale: 0.3,
            win_probability: 0.70,
            itm_loss_fraction: Decimal::new(5, 2),
            warmup_bars: 30,
            min_bars: 100,
        }
    }
}

/// RSI-threshold entry backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiBacktestParams {
    pub tickers: Vec<String>,
    pub lookback_days: u32,
    pub rsi_period: usize,
    pub rsi_threshold: f64,
    pub initial_cash: Decimal,
    /// Commission as a fraction of traded notional.
    pub commission: Decimal,
    pub hold_bars: Vec<usize>,
    /// Minimum raw bars before a ticker is backtested.
    pub min_history_bars: usize,
    /// Minimum bars remaining once the indicator has warmed up.
    pub min_signal_bars: usize,
}

impl Default for RsiBacktestParams {
    fn default() -> Self {
        Self {
            tickers: [
                "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "JNJ", "V", "PG", "JPM",
                "UNH", "HD", "MA", "DIS", "PYPL", "ADBE", "NFLX", "INTC", "VZ", "T", "PFE", "MRK",
                "KO", "PEP", "WMT", "TMO", "COST", "NKE", "ABBV", "CVX", "XOM", "LLY", "QCOM",
                "AVGO", "TXN", "LOW", "NEE", "UPS",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            lookback_days: 5 * 365,
            rsi_period: 14,
            rsi_threshold: 35.0,
            initial_cash: Decimal::from(100_000),
            commission: Decimal::new(1, 3),
            hold_bars: vec![21, 42, 63],
            min_history_bars: 200,
            min_signal_bars: 100,
        }
    }
}
