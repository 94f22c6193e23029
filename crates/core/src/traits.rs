use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{BrokerError, MarketDataError};
use crate::types::{OptionsOrder, OptionsPosition, OrderHandle, PriceBar};

/// Source of historical daily prices.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Bars for `ticker` covering the last `lookback_days`, oldest first.
    async fn get_price_history(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, MarketDataError>;
}

/// Account and order access on a broker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Net liquidation value of the account.
    async fn get_account_value(&self) -> Result<Decimal, BrokerError>;

    async fn get_positions(&self) -> Result<Vec<OptionsPosition>, BrokerError>;

    async fn place_order(&self, order: &OptionsOrder) -> Result<OrderHandle, BrokerError>;

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError>;

    /// Brings position marks up to `today` for brokers without live quotes.
    async fn refresh_marks(&self, _today: NaiveDate) -> Result<(), BrokerError> {
        Ok(())
    }
}
