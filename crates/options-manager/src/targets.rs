//! Profit target rule for short puts.

use theta_core::{OptionsPosition, StrategyConfig};

use crate::types::{CloseReason, ExitAction};

/// Returns a close action once the short position has captured at least
/// `take_profit` of its entry premium.
pub fn check_exit(pos: &OptionsPosition, strategy: &StrategyConfig) -> Option<ExitAction> {
    if !pos.is_short() {
        return None;
    }

    let captured = pos.premium_captured();
    if captured < strategy.take_profit {
        return None;
    }

    tracing::info!(
        contract = %pos.contract.display_name(),
        captured = %captured,
        target = %strategy.take_profit,
        "Profit target hit"
    );
    Some(ExitAction::Close {
        contract: pos.contract.clone(),
        quantity: pos.quantity.abs(),
        reason: CloseReason::ProfitTarget,
    })
}

pub fn check_exits(positions: &[OptionsPosition], strategy: &StrategyConfig) -> Vec<ExitAction> {
    positions
        .iter()
        .filter_map(|p| check_exit(p, strategy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use theta_core::{OptionRight, OptionsContract};

    fn make_position(quantity: i32, entry: Decimal, current: Decimal) -> OptionsPosition {
        let expiry = NaiveDate::from_ymd_opt(2025, 4, 17).unwrap();
        OptionsPosition {
            contract: OptionsContract::new("TQQQ", expiry, dec!(60), OptionRight::Put),
            quantity,
            avg_fill_price: entry,
            current_price: current,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn closes_at_half_premium_captured() {
        let strategy = StrategyConfig::default();
        let pos = make_position(-3, dec!(4.00), dec!(2.00));
        let action = check_exit(&pos, &strategy);
        assert!(matches!(
            action,
            Some(ExitAction::Close {
                quantity: 3,
                reason: CloseReason::ProfitTarget,
                ..
            })
        ));
    }

    #[test]
    fn holds_below_target() {
        let strategy = StrategyConfig::default();
        // 40% captured
        let pos = make_position(-1, dec!(5.00), dec!(3.00));
        assert!(check_exit(&pos, &strategy).is_none());
    }

    #[test]
    fn ignores_long_positions() {
        let strategy = StrategyConfig::default();
        let pos = make_position(2, dec!(5.00), dec!(1.00));
        assert!(check_exit(&pos, &strategy).is_none());
    }

    #[test]
    fn checks_every_position() {
        let strategy = StrategyConfig::default();
        let positions = vec![
            make_position(-1, dec!(4.00), dec!(1.00)),
            make_position(-1, dec!(4.00), dec!(3.90)),
            make_position(-2, dec!(2.00), dec!(0.50)),
        ];
        let exits = check_exits(&positions, &strategy);
        assert_eq!(exits.len(), 2);
    }
}
