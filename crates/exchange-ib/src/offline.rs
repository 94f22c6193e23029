//! Broker used when no gateway session is configured.

use async_trait::async_trait;
use rust_decimal::Decimal;
use theta_core::{BrokerClient, BrokerError, OptionsOrder, OptionsPosition, OrderHandle};
use tracing::warn;

/// Answers every request with `BrokerError::NotConnected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBroker;

#[async_trait]
impl BrokerClient for OfflineBroker {
    async fn get_account_value(&self) -> Result<Decimal, BrokerError> {
        Err(BrokerError::NotConnected)
    }

    async fn get_positions(&self) -> Result<Vec<OptionsPosition>, BrokerError> {
        Err(BrokerError::NotConnected)
    }

    async fn place_order(&self, order: &OptionsOrder) -> Result<OrderHandle, BrokerError> {
        warn!(
            contract = %order.contract.display_name(),
            "Order not placed: broker offline"
        );
        Err(BrokerError::NotConnected)
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<(), BrokerError> {
        Err(BrokerError::NotConnected)
    }
}
