//! Account queries with an explicit simulated fallback.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use theta_core::{BrokerClient, BrokerError, OptionsPosition};
use tracing::{debug, warn};

/// Where an account value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountValue {
    /// Reported by a connected broker.
    Live(Decimal),
    /// No broker session; the configured starting capital is assumed.
    SimulatedDefault(Decimal),
}

impl AccountValue {
    pub fn value(&self) -> Decimal {
        match self {
            Self::Live(v) | Self::SimulatedDefault(v) => *v,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::SimulatedDefault(_))
    }
}

/// Account value from `broker`, or `default` when no session exists.
///
/// # Errors
/// Propagates every broker error except `NotConnected`.
pub async fn resolve_account_value(
    broker: &dyn BrokerClient,
    default: Decimal,
) -> Result<AccountValue, BrokerError> {
    match broker.get_account_value().await {
        Ok(value) => {
            debug!(value = %value, "Account value from broker");
            Ok(AccountValue::Live(value))
        }
        Err(BrokerError::NotConnected) => {
            warn!(default = %default, "Broker not connected, using simulated account value");
            Ok(AccountValue::SimulatedDefault(default))
        }
        Err(e) => Err(e),
    }
}

/// Open positions from `broker`, or none when no session exists.
///
/// # Errors
/// Propagates every broker error except `NotConnected`.
pub async fn resolve_positions(
    broker: &dyn BrokerClient,
) -> Result<Vec<OptionsPosition>, BrokerError> {
    match broker.get_positions().await {
        Err(BrokerError::NotConnected) => {
            debug!("Broker not connected, assuming no open positions");
            Ok(Vec::new())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineBroker;
    use crate::paper::PaperBroker;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use theta_core::{OptionsOrder, OrderHandle};

    struct FlakyBroker;

    #[async_trait]
    impl BrokerClient for FlakyBroker {
        async fn get_account_value(&self) -> Result<Decimal, BrokerError> {
            Err(BrokerError::Transient("timeout".to_string()))
        }

        async fn get_positions(&self) -> Result<Vec<OptionsPosition>, BrokerError> {
            Err(BrokerError::Transient("timeout".to_string()))
        }

        async fn place_order(&self, _order: &OptionsOrder) -> Result<OrderHandle, BrokerError> {
            Err(BrokerError::Transient("timeout".to_string()))
        }

        async fn cancel_order(&self, _order_id: &str) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn connected_broker_is_live() {
        let broker = PaperBroker::new(dec!(75000));
        let value = resolve_account_value(&broker, dec!(50000)).await.unwrap();

        assert_eq!(value, AccountValue::Live(dec!(75000)));
        assert!(!value.is_simulated());
    }

    #[tokio::test]
    async fn offline_broker_falls_back_to_default() {
        let value = resolve_account_value(&OfflineBroker, dec!(50000))
            .await
            .unwrap();

        assert_eq!(value, AccountValue::SimulatedDefault(dec!(50000)));
        assert_eq!(value.value(), dec!(50000));
    }

    #[tokio::test]
    async fn transient_error_is_not_masked() {
        let err = resolve_account_value(&FlakyBroker, dec!(50000))
            .await
            .unwrap_err();

        assert_eq!(err, BrokerError::Transient("timeout".to_string()));
    }

    #[tokio::test]
    async fn offline_positions_are_empty() {
        assert!(resolve_positions(&OfflineBroker).await.unwrap().is_empty());
        assert!(resolve_positions(&FlakyBroker).await.is_err());
    }
}
