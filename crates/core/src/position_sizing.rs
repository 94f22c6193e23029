use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Capital committed to the next trade: always a fraction of the *current*
/// equity, so size compounds with the account.
#[must_use]
pub fn position_value(account_equity: Decimal, position_fraction: Decimal) -> Decimal {
    account_equity * position_fraction
}

/// Number of cash-secured put contracts a position value can collateralise.
///
/// # Arguments
/// * `position_value` - Capital allocated to the trade
/// * `strike` - Put strike price
/// * `multiplier` - Shares per contract (100 for US equity options)
///
/// # Returns
/// Whole contracts, at least 1
///
/// # Errors
/// Returns error if strike or multiplier is not positive
pub fn cash_secured_contracts(
    position_value: Decimal,
    strike: Decimal,
    multiplier: Decimal,
) -> Result<i32> {
    if strike <= Decimal::ZERO {
        anyhow::bail!("Strike must be positive");
    }
    if multiplier <= Decimal::ZERO {
        anyhow::bail!("Contract multiplier must be positive");
    }

    let collateral = strike * multiplier;
    let contracts = (position_value / collateral).floor();

    Ok(contracts.to_i32().unwrap_or(i32::MAX).max(1))
}
