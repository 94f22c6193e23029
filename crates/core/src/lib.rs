pub mod config;
pub mod config_loader;
pub mod error;
pub mod position_sizing;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, BotConfig, BrokerConfig, HistoricalParams, MonteCarloSettings, RsiBacktestParams,
    SimulationParams, StrategyConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{BrokerError, MarketDataError};
pub use position_sizing::{cash_secured_contracts, position_value};
pub use traits::{BrokerClient, MarketDataProvider};
pub use types::{
    OptionRight, OptionsContract, OptionsOrder, OptionsPosition, OrderHandle, OrderSide,
    OrderType, PriceBar,
};
