//! Paper trading broker.
//!
//! Fills every order immediately against in-memory state without touching a
//! gateway. Limit orders fill at their limit; market orders fill at the
//! position's last mark and are rejected when no mark exists.
//!
//! Without quotes, positions are re-marked by linear time decay of the entry
//! premium each time [`BrokerClient::refresh_marks`] moves to a new date.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use theta_core::{
    BrokerClient, BrokerError, OptionsContract, OptionsOrder, OptionsPosition, OrderHandle,
    OrderSide, OrderType,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default per-contract commission.
pub const DEFAULT_COMMISSION_PER_CONTRACT: Decimal = dec!(0.65);

#[derive(Debug, Default)]
struct PaperState {
    cash: Decimal,
    positions: Vec<OptionsPosition>,
    fills: Vec<OrderHandle>,
    /// Trading date of the last mark refresh.
    session_date: Option<NaiveDate>,
}

impl PaperState {
    /// Fill time on the session date, wall clock when the session is today.
    fn timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.session_date {
            Some(date) if date != now.date_naive() => {
                Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
            }
            _ => now,
        }
    }
}

/// In-memory broker implementing [`BrokerClient`].
#[derive(Debug)]
pub struct PaperBroker {
    state: Mutex<PaperState>,
    commission_per_contract: Decimal,
    sequence: AtomicU64,
}

impl PaperBroker {
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            state: Mutex::new(PaperState {
                cash: starting_cash,
                ..PaperState::default()
            }),
            commission_per_contract: DEFAULT_COMMISSION_PER_CONTRACT,
            sequence: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn with_commission(mut self, per_contract: Decimal) -> Self {
        self.commission_per_contract = per_contract;
        self
    }

    pub async fn cash(&self) -> Decimal {
        self.state.lock().await.cash
    }

    /// Every fill so far, oldest first.
    pub async fn fills(&self) -> Vec<OrderHandle> {
        self.state.lock().await.fills.clone()
    }

    /// Updates the mark of every position on `contract`.
    pub async fn set_mark(&self, contract: &OptionsContract, price: Decimal) {
        let mut state = self.state.lock().await;
        for position in state
            .positions
            .iter_mut()
            .filter(|p| &p.contract == contract)
        {
            position.current_price = price;
        }
    }

    fn next_order_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("PAPER-{}-{seq}", Utc::now().timestamp_millis())
    }
}

fn fill_price(order: &OptionsOrder, existing: Option<&OptionsPosition>) -> Result<Decimal, BrokerError> {
    match &order.order_type {
        OrderType::Limit { price } => Ok(*price),
        OrderType::Market | OrderType::MarketOnClose => existing
            .map(|p| p.current_price)
            .ok_or_else(|| {
                BrokerError::Rejected(format!(
                    "No quote for {} in paper mode, use a limit order",
                    order.contract.display_name()
                ))
            }),
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn get_account_value(&self) -> Result<Decimal, BrokerError> {
        let state = self.state.lock().await;
        let marked: Decimal = state
            .positions
            .iter()
            .map(|p| Decimal::from(p.quantity) * p.current_price * p.contract.multiplier)
            .sum();
        Ok(state.cash + marked)
    }

    async fn get_positions(&self) -> Result<Vec<OptionsPosition>, BrokerError> {
        Ok(self.state.lock().await.positions.clone())
    }

    async fn place_order(&self, order: &OptionsOrder) -> Result<OrderHandle, BrokerError> {
        if order.quantity <= 0 {
            return Err(BrokerError::Rejected(format!(
                "Quantity must be positive, got {}",
                order.quantity
            )));
        }

        let mut state = self.state.lock().await;
        let index = state
            .positions
            .iter()
            .position(|p| p.contract == order.contract);
        let price = fill_price(order, index.map(|i| &state.positions[i]))?;
        if price < Decimal::ZERO {
            return Err(BrokerError::Rejected(format!("Negative price {price}")));
        }

        let signed = match order.side {
            OrderSide::Buy => order.quantity,
            OrderSide::Sell => -order.quantity,
        };
        let commission = self.commission_per_contract * Decimal::from(order.quantity);
        let notional = Decimal::from(signed) * price * order.contract.multiplier;
        state.cash -= notional + commission;

        let now = state.timestamp();
        match index {
            Some(i) => {
                let position = &mut state.positions[i];
                let new_quantity = position.quantity + signed;
                if new_quantity == 0 {
                    state.positions.remove(i);
                } else {
                    if position.quantity.signum() == signed.signum() {
                        // Adding to the position: blend the entry premium
                        let old = Decimal::from(position.quantity.abs());
                        let added = Decimal::from(order.quantity);
                        position.avg_fill_price =
                            (position.avg_fill_price * old + price * added) / (old + added);
                    } else if position.quantity.signum() != new_quantity.signum() {
                        // Crossed through flat: the remainder is a new position
                        position.avg_fill_price = price;
                        position.opened_at = now;
                    }
                    position.quantity = new_quantity;
                    position.current_price = price;
                }
            }
            None => state.positions.push(OptionsPosition {
                contract: order.contract.clone(),
                quantity: signed,
                avg_fill_price: price,
                current_price: price,
                opened_at: now,
            }),
        }

        let handle = OrderHandle {
            order_id: self.next_order_id(),
            contract: order.contract.clone(),
            side: order.side,
            quantity: order.quantity,
            avg_fill_price: price,
            commission,
            submitted_at: now,
        };
        state.fills.push(handle.clone());

        info!(
            order_id = %handle.order_id,
            contract = %handle.contract.display_name(),
            side = ?handle.side,
            price = %handle.avg_fill_price,
            quantity = handle.quantity,
            "Paper fill simulated"
        );

        Ok(handle)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let state = self.state.lock().await;
        if state.fills.iter().any(|f| f.order_id == order_id) {
            debug!(order_id, "Cancel requested for filled paper order");
            return Err(BrokerError::Rejected(format!("Order {order_id} already filled")));
        }
        Err(BrokerError::Rejected(format!("Unknown order {order_id}")))
    }

    async fn refresh_marks(&self, today: NaiveDate) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        if state.session_date == Some(today) {
            return Ok(());
        }
        state.session_date = Some(today);
        for position in &mut state.positions {
            position.current_price = position.time_decay_mark(today);
        }
        debug!(%today, positions = state.positions.len(), "Paper marks decayed");
        Ok(())
    }
}
