//! The per-instrument bar-by-bar simulator.
//!
//! Drives one `Decider` over one bar sequence, honoring intra-bar bracket
//! exits, commission/slippage, and cash solvency, and produces a
//! `TickerResult`.

use crate::bar::{find_first_anomaly, Bar, Window};
use crate::decision::{resolve_stop_or_target, Decision, Signal};
use crate::error::SimulationError;
use crate::position::{Position, PositionState};
use crate::state::StrategyState;
use crate::ticker_result::{compute_aggregates, TickerResult};
use crate::trade::{EquityPoint, ExitReason, Trade};
use serde::{Deserialize, Serialize};

/// A strategy callable: invoked once per bar (twice in the one documented
/// edge case where a signal exit immediately frees up capital for a new
/// entry within the same bar; see the bar loop below).
pub trait Decider {
    fn decide(&mut self, window: Window<'_>, state: &mut StrategyState) -> Decision;

    /// Number of calls so far that degraded to `Signal::None` because of a
    /// sandbox failure (timeout, exception, malformed return) rather than a
    /// genuine strategy decision. Sandbox-backed deciders override this;
    /// plain closures never fail, so the default is always accurate for
    /// them.
    fn sandbox_failures(&self) -> u32 {
        0
    }
}

impl<F> Decider for F
where
    F: FnMut(Window<'_>, &mut StrategyState) -> Decision,
{
    fn decide(&mut self, window: Window<'_>, state: &mut StrategyState) -> Decision {
        self(window, state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorParams {
    pub initial_capital: f64,
    /// Fraction of current cash committed to a new entry, in (0, 1].
    pub position_size: f64,
    /// Commission rate per fill, in [0, 1).
    pub commission: f64,
    /// Slippage rate per fill, in [0, 1).
    pub slippage: f64,
}

/// Run one instrument's simulation end to end. Never panics on bad input
/// data; malformed bars abort the instrument with a failed `TickerResult`
/// rather than propagating an `Err`.
pub fn simulate_instrument(
    symbol: &str,
    bars: &[Bar],
    params: SimulatorParams,
    decider: &mut impl Decider,
) -> TickerResult {
    if bars.is_empty() {
        return TickerResult::empty(symbol);
    }

    if let Some(bad_index) = find_first_anomaly(bars) {
        tracing::warn!(symbol, bad_index, "numeric anomaly aborted instrument");
        return TickerResult::failed(
            symbol,
            SimulationError::NumericAnomaly {
                symbol: symbol.to_string(),
                index: bad_index,
            }
            .to_string(),
        );
    }

    let mut state = StrategyState::new();
    let mut cash = params.initial_capital;
    let mut position = PositionState::Flat;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity: Vec<EquityPoint> = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let bar = &bars[i];

        // Step 1: intra-bar bracket exits, tested before the strategy is
        // consulted. Ties resolve to STOP_LOSS (checked first).
        if let PositionState::Long(pos) = position {
            if let Some(stop) = pos.stop_price {
                if bar.low <= stop {
                    close_position(
                        symbol, &pos, bar.ts, stop, ExitReason::StopLoss, &params, &mut cash,
                        &mut trades,
                    );
                    position = PositionState::Flat;
                }
            }
        }
        if let PositionState::Long(pos) = position {
            if let Some(target) = pos.target_price {
                if bar.high >= target {
                    close_position(
                        symbol, &pos, bar.ts, target, ExitReason::TakeProfit, &params, &mut cash,
                        &mut trades,
                    );
                    position = PositionState::Flat;
                }
            }
        }

        let window = Window::new(symbol, &bars[..=i]);

        // Step 2: if still long, let the strategy decide whether to exit
        // on this bar's close.
        if let PositionState::Long(pos) = position {
            let decision = decider.decide(window, &mut state);
            if matches!(decision.signal, Signal::Sell | Signal::Flat) {
                close_position(
                    symbol,
                    &pos,
                    bar.ts,
                    bar.close,
                    ExitReason::Signal,
                    &params,
                    &mut cash,
                    &mut trades,
                );
                position = PositionState::Flat;
            }
        }

        // Step 3: if flat (whether entering the bar flat, or just closed
        // above), let the strategy decide whether to enter.
        if position.is_flat() {
            let decision = decider.decide(window, &mut state);
            if decision.signal == Signal::Buy {
                if let Some(pos) = try_open_position(bar, &decision, &params, &mut cash) {
                    position = PositionState::Long(pos);
                }
            }
        }

        // Step 4: mark-to-market equity at close.
        let mark = match position {
            PositionState::Flat => 0.0,
            PositionState::Long(pos) => pos.mark_to_close(bar.close),
        };
        equity.push(EquityPoint {
            ts: bar.ts,
            equity: cash + mark,
        });
    }

    // After the final bar, force-close any remaining position.
    if let PositionState::Long(pos) = position {
        let last = bars.last().expect("bars is non-empty");
        close_position(
            symbol,
            &pos,
            last.ts,
            last.close,
            ExitReason::EndOfData,
            &params,
            &mut cash,
            &mut trades,
        );
        if let Some(last_point) = equity.last_mut() {
            last_point.equity = cash;
        }
    }

    let aggregates = compute_aggregates(&trades);
    TickerResult {
        symbol: symbol.to_string(),
        trades,
        equity_curve: equity,
        aggregates,
        success: true,
        error: None,
        sandbox_failures: decider.sandbox_failures(),
    }
}

fn try_open_position(
    bar: &Bar,
    decision: &Decision,
    params: &SimulatorParams,
    cash: &mut f64,
) -> Option<Position> {
    let reference_price = bar.close;
    let fill_price = reference_price * (1.0 + params.slippage);

    let multiplier = decision.size_multiplier.unwrap_or(1.0).clamp(0.0, 1.0);
    let effective_fraction = params.position_size * multiplier;
    let size = (*cash * effective_fraction / fill_price).floor();

    if size < 1.0 {
        // Size computes to 0: entry skipped, not an error.
        return None;
    }

    let commission = fill_price * size * params.commission;
    let notional = size * fill_price;

    if *cash - notional - commission < 0.0 {
        // Solvency rule: a buy that would drive cash negative is skipped.
        return None;
    }

    *cash -= notional + commission;

    let entry_price = fill_price;
    let stop_price = decision
        .stop_loss
        .map(|v| resolve_stop_or_target(v, entry_price));
    let target_price = decision
        .take_profit
        .map(|v| resolve_stop_or_target(v, entry_price));

    Some(Position {
        entry_price,
        entry_time: bar.ts,
        size,
        stop_price,
        target_price,
    })
}

#[allow(clippy::too_many_arguments)]
fn close_position(
    symbol: &str,
    position: &Position,
    exit_time: i64,
    reference_price: f64,
    reason: ExitReason,
    params: &SimulatorParams,
    cash: &mut f64,
    trades: &mut Vec<Trade>,
) {
    // A sell fill (bracket exit, signal exit, or forced end-of-data close)
    // realizes slippage in the adverse direction off the reference price.
    let fill_price = reference_price * (1.0 - params.slippage);
    let exit_fee = fill_price * position.size * params.commission;
    let entry_fee = position.entry_price * position.size * params.commission;

    *cash += fill_price * position.size - exit_fee;

    let gross = (fill_price - position.entry_price) * position.size;
    let pnl = gross - entry_fee - exit_fee;
    let notional = position.entry_price * position.size;
    let pnl_percent = if notional > 0.0 { pnl / notional * 100.0 } else { 0.0 };

    trades.push(Trade {
        instrument: symbol.to_string(),
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_time,
        exit_price: fill_price,
        size: position.size,
        pnl,
        pnl_percent,
        exit_reason: reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(ts, o, h, l, c, 1_000.0)
    }

    fn no_cost_params(capital: f64) -> SimulatorParams {
        SimulatorParams {
            initial_capital: capital,
            position_size: 1.0,
            commission: 0.0,
            slippage: 0.0,
        }
    }

    /// Scenario 1: buy-and-hold.
    #[test]
    fn buy_and_hold_scenario() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 110.0, 110.0, 110.0, 110.0),
            bar(2, 121.0, 121.0, 121.0, 121.0),
        ];
        let mut calls = 0;
        let mut decider = move |_w: Window<'_>, _s: &mut StrategyState| {
            calls += 1;
            if calls == 1 {
                Decision::buy()
            } else {
                Decision::none()
            }
        };
        let result =
            simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert!((trade.pnl - 21.0).abs() < 1e-9);
        assert!((result.equity_curve.last().unwrap().equity - 121.0).abs() < 1e-9);
    }

    /// Scenario 2: stop-loss trigger.
    #[test]
    fn stop_loss_trigger_scenario() {
        let bars = vec![
            bar(0, 100.0, 101.0, 95.0, 98.0),
            bar(1, 98.0, 99.0, 96.0, 97.0),
        ];
        let mut first = true;
        let mut decider = move |_w: Window<'_>, _s: &mut StrategyState| {
            if first {
                first = false;
                Decision {
                    signal: Signal::Buy,
                    size_multiplier: None,
                    stop_loss: Some(0.98),
                    take_profit: None,
                }
            } else {
                Decision::none()
            }
        };
        let result =
            simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.exit_price - 98.0).abs() < 1e-9);
        assert!((trade.pnl - (-2.0)).abs() < 1e-9);
    }

    /// Scenario 3: take-profit precedes a same-bar SELL signal.
    #[test]
    fn take_profit_precedes_signal() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 100.0, 106.0, 100.0, 104.0),
        ];
        let mut call = 0;
        let mut decider = move |_w: Window<'_>, _s: &mut StrategyState| {
            call += 1;
            match call {
                1 => Decision {
                    signal: Signal::Buy,
                    size_multiplier: None,
                    stop_loss: None,
                    take_profit: Some(105.0),
                },
                _ => Decision {
                    signal: Signal::Sell,
                    ..Decision::none()
                },
            }
        };
        let result =
            simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
        assert!((result.trades[0].exit_price - 105.0).abs() < 1e-9);
    }

    /// Scenario 4: both brackets hit in the same bar -> STOP_LOSS wins.
    #[test]
    fn both_brackets_hit_stop_wins() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 100.0, 106.0, 97.0, 102.0),
        ];
        let mut call = 0;
        let mut decider = move |_w: Window<'_>, _s: &mut StrategyState| {
            call += 1;
            match call {
                1 => Decision {
                    signal: Signal::Buy,
                    size_multiplier: None,
                    stop_loss: Some(98.0),
                    take_profit: Some(105.0),
                },
                _ => Decision::none(),
            }
        };
        let result =
            simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert!((result.trades[0].exit_price - 98.0).abs() < 1e-9);
    }

    /// Scenario 5: commission and slippage both realized on both legs.
    #[test]
    fn commission_and_slippage_scenario() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 110.0, 110.0, 110.0, 110.0),
        ];
        let params = SimulatorParams {
            initial_capital: 150.0,
            position_size: 1.0,
            commission: 0.001,
            slippage: 0.0005,
        };
        let mut call = 0;
        let mut decider = move |_w: Window<'_>, _s: &mut StrategyState| {
            call += 1;
            if call == 1 {
                Decision::buy()
            } else {
                Decision::none()
            }
        };
        let result = simulate_instrument("TEST", &bars, params, &mut decider);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert!((trade.entry_price - 100.05).abs() < 1e-6);
        assert!((trade.exit_price - 109.945).abs() < 1e-6);
        assert!((trade.pnl - 9.685).abs() < 1e-2);
    }

    #[test]
    fn empty_bars_produce_empty_result() {
        let mut decider = |_w: Window<'_>, _s: &mut StrategyState| Decision::none();
        let result = simulate_instrument("TEST", &[], no_cost_params(100.0), &mut decider);
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.is_empty());
        assert!(result.success);
    }

    #[test]
    fn always_none_strategy_holds_flat_equity() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 101.0, 101.0, 101.0, 101.0),
        ];
        let mut decider = |_w: Window<'_>, _s: &mut StrategyState| Decision::none();
        let result = simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);
        assert!(result.trades.is_empty());
        for point in &result.equity_curve {
            assert!((point.equity - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn repeated_buy_signal_while_long_does_not_oscillate() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 101.0, 101.0, 101.0, 101.0),
            bar(2, 102.0, 102.0, 102.0, 102.0),
        ];
        let mut decider = |_w: Window<'_>, _s: &mut StrategyState| Decision::buy();
        let result = simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);
        // Only one entry ever opens despite BUY on every bar.
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
    }

    #[test]
    fn zero_size_entry_is_skipped_not_an_error() {
        let bars = vec![bar(0, 1_000_000.0, 1_000_000.0, 1_000_000.0, 1_000_000.0)];
        let mut decider = |_w: Window<'_>, _s: &mut StrategyState| Decision::buy();
        // initial_capital too small to buy even one share at this price.
        let result = simulate_instrument("TEST", &bars, no_cost_params(10.0), &mut decider);
        assert!(result.trades.is_empty());
        assert!((result.equity_curve[0].equity - 10.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_bar_aborts_instrument() {
        let bars = vec![bar(0, f64::NAN, 1.0, 1.0, 1.0)];
        let mut decider = |_w: Window<'_>, _s: &mut StrategyState| Decision::none();
        let result = simulate_instrument("TEST", &bars, no_cost_params(100.0), &mut decider);
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
