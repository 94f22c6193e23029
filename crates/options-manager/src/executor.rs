//! Sizes opportunities into put sales and sends orders to the broker.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use theta_core::{
    cash_secured_contracts, position_value, BrokerClient, OptionRight, OptionsContract,
    OptionsOrder, OrderHandle, OrderSide, OrderType, StrategyConfig,
};
use theta_ib::resolve_account_value;
use tracing::info;

use crate::types::{ExitAction, Opportunity, TradePlan};

/// Builds the cash-secured put sale for `opportunity`.
///
/// Strike is `otm_fraction` below spot rounded to whole dollars; expiry is
/// `dte_target` calendar days after `today`. The limit is the per-share
/// premium that would earn `premium_target` on the allocated capital.
///
/// # Errors
/// Fails when the strike rounds to zero or the expiry overflows the calendar.
pub fn plan_trade(
    opportunity: &Opportunity,
    account_value: Decimal,
    strategy: &StrategyConfig,
    today: NaiveDate,
) -> Result<TradePlan> {
    let allocated = position_value(account_value, strategy.position_fraction);
    let strike = (opportunity.price * (Decimal::ONE - strategy.otm_fraction)).round_dp(0);
    let expiry = today
        .checked_add_days(Days::new(u64::from(strategy.dte_target)))
        .context("Expiry date out of range")?;

    let contract = OptionsContract::new(&opportunity.ticker, expiry, strike, OptionRight::Put);
    let quantity = cash_secured_contracts(allocated, strike, contract.multiplier)
        .with_context(|| format!("Cannot size {}", contract.display_name()))?;

    let estimated_premium = allocated * strategy.premium_target;
    let limit_price =
        (estimated_premium / (Decimal::from(quantity) * contract.multiplier)).round_dp(2);

    Ok(TradePlan {
        contract,
        quantity,
        position_value: allocated,
        estimated_premium,
        limit_price,
        expiry,
    })
}

/// Sells the planned put for `opportunity` at its estimated premium.
///
/// Account value comes from the broker, or the strategy's starting capital
/// when no session exists.
pub async fn execute_trade(
    broker: &dyn BrokerClient,
    opportunity: &Opportunity,
    strategy: &StrategyConfig,
    today: NaiveDate,
) -> Result<OrderHandle> {
    let account = resolve_account_value(broker, strategy.initial_capital).await?;
    let plan = plan_trade(opportunity, account.value(), strategy, today)?;

    info!(
        contract = %plan.contract.display_name(),
        quantity = plan.quantity,
        limit = %plan.limit_price,
        position_value = %plan.position_value,
        estimated_premium = %plan.estimated_premium,
        simulated_account = account.is_simulated(),
        "Selling put"
    );

    let order = OptionsOrder {
        contract: plan.contract,
        side: OrderSide::Sell,
        quantity: plan.quantity,
        order_type: OrderType::Limit {
            price: plan.limit_price,
        },
    };

    let handle = broker.place_order(&order).await?;
    info!(order_id = %handle.order_id, "Sell-to-open placed");
    Ok(handle)
}

/// Buys back a position flagged by the exit rules.
pub async fn execute_exit(broker: &dyn BrokerClient, action: &ExitAction) -> Result<OrderHandle> {
    let ExitAction::Close {
        contract,
        quantity,
        reason,
    } = action;

    let order = OptionsOrder {
        contract: contract.clone(),
        side: OrderSide::Buy,
        quantity: *quantity,
        order_type: OrderType::Market,
    };

    let handle = broker
        .place_order(&order)
        .await
        .with_context(|| format!("Failed to close {}", contract.display_name()))?;
    info!(
        order_id = %handle.order_id,
        contract = %contract.display_name(),
        %reason,
        price = %handle.avg_fill_price,
        "Position closed"
    );
    Ok(handle)
}
