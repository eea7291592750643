//! Per-instrument work item: wiring the sandboxed strategy into the core
//! simulator as a single callable, one per instrument.

use quantsim_core::bar::Bar;
use quantsim_core::simulator::{simulate_instrument, SimulatorParams};
use quantsim_core::ticker_result::TickerResult;
use quantsim_sandbox::{CompiledStrategy, SandboxDecider};

pub fn simulate_one(
    symbol: &str,
    bars: &[Bar],
    compiled: &CompiledStrategy,
    params: SimulatorParams,
) -> TickerResult {
    let mut decider = SandboxDecider::new(compiled, symbol);
    simulate_instrument(symbol, bars, params, &mut decider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimulatorParams {
        SimulatorParams {
            initial_capital: 1_000.0,
            position_size: 1.0,
            commission: 0.0,
            slippage: 0.0,
        }
    }

    #[test]
    fn sandboxed_buy_and_hold_strategy_executes_one_trade() {
        let source = r#"
            fn decide(window, state) {
                if window.close.len() == 1 {
                    #{ signal: "BUY" }
                } else {
                    #{ signal: "NONE" }
                }
            }
        "#;
        let compiled = quantsim_sandbox::validate(source).unwrap();
        let bars = vec![
            Bar::new(0, 100.0, 100.0, 100.0, 100.0, 1_000.0),
            Bar::new(1, 100.0, 110.0, 100.0, 110.0, 1_000.0),
        ];
        let result = simulate_one("AAA", &bars, &compiled, params());
        assert!(result.success);
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn sandboxed_strategy_that_always_errors_degrades_to_none_and_counts_failures() {
        let source = r#"
            fn decide(window, state) {
                throw "boom";
            }
        "#;
        let compiled = quantsim_sandbox::validate(source).unwrap();
        let bars = vec![Bar::new(0, 100.0, 100.0, 100.0, 100.0, 1_000.0)];
        let result = simulate_one("AAA", &bars, &compiled, params());
        assert!(result.success);
        assert!(result.trades.is_empty());
        assert!(result.sandbox_failures > 0);
    }
}
