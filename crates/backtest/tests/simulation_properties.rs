use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use theta_backtest::{
    simulate, simulate_parallel, MonteCarloSimulator, SimulationConfig, SimulationError,
};
use theta_core::SimulationParams;

fn configs(win_probability: f64) -> Vec<SimulationConfig> {
    let mut out = Vec::new();
    for (position_fraction, premium_fraction) in [(dec!(0.1), dec!(0.02)), (dec!(1), dec!(0.5))] {
        for (trades_per_month, months) in [(1, 1), (4, 36), (10, 6)] {
            let params = SimulationParams {
                initial_capital: dec!(10000),
                position_fraction,
                premium_fraction,
                win_probability,
                trades_per_month,
                months,
                ..SimulationParams::default()
            };
            out.push(SimulationConfig::new(&params).unwrap());
        }
    }
    out
}

#[test]
fn certain_wins_grow_every_path() {
    for config in configs(1.0) {
        for result in simulate(&config, 10, 3).unwrap() {
            assert!(result.path().is_non_decreasing());
            assert!(result.final_capital() > config.initial_capital());
        }
    }
}

#[test]
fn certain_losses_shrink_every_path() {
    for config in configs(0.0) {
        for result in simulate(&config, 10, 3).unwrap() {
            assert!(result.path().is_non_increasing());
            assert!(result.final_capital() < config.initial_capital());
        }
    }
}

#[test]
fn empty_schedules_leave_capital_untouched() {
    for (trades_per_month, months) in [(0, 36), (4, 0), (0, 0)] {
        let config = SimulationConfig::new(&SimulationParams {
            trades_per_month,
            months,
            ..SimulationParams::default()
        })
        .unwrap();

        for result in simulate(&config, 4, 1).unwrap() {
            assert!(result.path().is_empty());
            assert_eq!(result.final_capital(), config.initial_capital());
        }
    }
}

#[test]
fn seeded_runs_are_reproducible_sequentially_and_in_parallel() {
    let config = SimulationConfig::new(&SimulationParams::default()).unwrap();

    let a = simulate(&config, 200, 31337).unwrap();
    let b = simulate(&config, 200, 31337).unwrap();
    let c = simulate_parallel(&config, 200, 31337).unwrap();

    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn invalid_inputs_are_rejected() {
    let bad = SimulationParams {
        win_probability: 2.0,
        ..SimulationParams::default()
    };
    assert!(matches!(
        SimulationConfig::new(&bad),
        Err(SimulationError::InvalidConfiguration { .. })
    ));

    let config = SimulationConfig::new(&SimulationParams::default()).unwrap();
    assert!(simulate(&config, 0, 1).is_err());
}

#[test]
fn default_strategy_report() {
    let config = SimulationConfig::new(&SimulationParams::default()).unwrap();
    let report = MonteCarloSimulator::new(config)
        .with_seed(2025)
        .with_parallel(true)
        .run(1000)
        .unwrap();

    let summary = &report.summary;
    let multiple = summary.final_capital.mean / dec!(50000);
    assert!(multiple > dec!(1.5) && multiple < dec!(2.5));
    assert_eq!(summary.mean_path.len(), 36);
    assert!(summary.final_capital.min > Decimal::ZERO);
    assert!(summary.final_capital.percentile(0.05) < summary.final_capital.percentile(0.95));
}
