//! Portfolio aggregation: combines per-instrument `TickerResult`s into the
//! portfolio equity curve, the metric vector, and the top/worst-performer
//! and sample-trade summaries.
//!
//! These are pure functions over `&[TickerResult]`; the aggregator never
//! mutates its inputs.

use crate::error::SimulationError;
use crate::metrics::{compute_metrics, Metrics};
use crate::trade::{EquityPoint, Trade};
use crate::ticker_result::TickerResult;
use serde::{Deserialize, Serialize};

/// A per-instrument simulation that did not contribute to the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub symbol: String,
    pub message: String,
}

/// One entry in `top_performers` / `worst_performers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    pub symbol: String,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub metrics: Metrics,
    pub equity_curve: Vec<EquityPoint>,
    pub top_performers: Vec<Performer>,
    pub worst_performers: Vec<Performer>,
    pub sample_trades: Vec<Trade>,
    pub failures: Vec<Failure>,
    pub tickers_simulated: usize,
}

const PERFORMER_CUT: usize = 10;

impl BacktestResult {
    fn empty(initial_capital: f64) -> Self {
        Self {
            metrics: Metrics::default(),
            equity_curve: vec![EquityPoint {
                ts: 0,
                equity: initial_capital,
            }],
            top_performers: Vec::new(),
            worst_performers: Vec::new(),
            sample_trades: Vec::new(),
            failures: Vec::new(),
            tickers_simulated: 0,
        }
    }
}

/// Build the terminal `BacktestResult` from every instrument's
/// `TickerResult`.
pub fn compute_backtest_result(
    results: &[TickerResult],
    initial_capital: f64,
    sample_trades_limit: usize,
) -> BacktestResult {
    // An instrument is skipped from the portfolio either because its
    // simulation failed outright (`success = false`) or because it produced
    // no bars to simulate at all (`success = true`, empty `equity_curve` —
    // an empty or date-filtered-to-empty series). Both are the same
    // DataUnavailable case from the caller's point of view and both are
    // recorded in `failures` rather than silently diluting the mean.
    let mut failures: Vec<Failure> = Vec::new();
    let mut successes: Vec<&TickerResult> = Vec::new();
    for r in results {
        if !r.success {
            let message = r.error.clone().unwrap_or_else(|| "unknown failure".to_string());
            tracing::warn!(symbol = %r.symbol, %message, "instrument excluded from aggregation");
            failures.push(Failure {
                symbol: r.symbol.clone(),
                message,
            });
        } else if r.equity_curve.is_empty() {
            let message = SimulationError::DataUnavailable {
                symbol: r.symbol.clone(),
            }
            .to_string();
            tracing::warn!(symbol = %r.symbol, "instrument skipped: no bars to simulate");
            failures.push(Failure {
                symbol: r.symbol.clone(),
                message,
            });
        } else {
            successes.push(r);
        }
    }

    if successes.is_empty() {
        let mut result = BacktestResult::empty(initial_capital);
        result.failures = failures;
        return result;
    }

    let equity_curve = portfolio_equity_curve(&successes, initial_capital);

    let all_trades: Vec<&Trade> = successes.iter().flat_map(|r| r.trades.iter()).collect();
    let metrics = compute_metrics(&equity_curve, &all_trades, initial_capital);

    let mut performers: Vec<Performer> = successes
        .iter()
        .map(|r| Performer {
            symbol: r.symbol.clone(),
            total_pnl: r.aggregates.total_pnl,
        })
        .collect();
    performers.sort_by(|a, b| b.total_pnl.partial_cmp(&a.total_pnl).unwrap());
    let top_performers: Vec<Performer> = performers.iter().take(PERFORMER_CUT).cloned().collect();
    let mut worst = performers;
    worst.sort_by(|a, b| a.total_pnl.partial_cmp(&b.total_pnl).unwrap());
    let worst_performers: Vec<Performer> = worst.into_iter().take(PERFORMER_CUT).collect();

    let mut sample_trades: Vec<Trade> = all_trades.into_iter().cloned().collect();
    sample_trades.sort_by(|a, b| b.exit_time.cmp(&a.exit_time));
    sample_trades.truncate(sample_trades_limit);

    BacktestResult {
        metrics,
        equity_curve,
        top_performers,
        worst_performers,
        sample_trades,
        failures,
        tickers_simulated: successes.len(),
    }
}

/// Form the union of all per-instrument timestamps; at each timestamp take
/// the mean across instruments of each instrument's last-known equity at or
/// before that timestamp (a step function), then rebase so `curve[0] ==
/// initial_capital`. `successes` must only contain instruments with a
/// non-empty `equity_curve`.
fn portfolio_equity_curve(successes: &[&TickerResult], initial_capital: f64) -> Vec<EquityPoint> {
    let mut timestamps: Vec<i64> = successes
        .iter()
        .flat_map(|r| r.equity_curve.iter().map(|p| p.ts))
        .collect();
    timestamps.sort_unstable();
    timestamps.dedup();

    if timestamps.is_empty() {
        return vec![EquityPoint {
            ts: 0,
            equity: initial_capital,
        }];
    }

    // Per-instrument cursor into its own (already time-ordered) equity
    // curve, advanced in lockstep with the union timestamps.
    let mut cursors = vec![0usize; successes.len()];
    let mut raw = Vec::with_capacity(timestamps.len());

    for &ts in &timestamps {
        let mut sum = 0.0;
        for (i, result) in successes.iter().enumerate() {
            let curve = &result.equity_curve;
            while cursors[i] + 1 < curve.len() && curve[cursors[i] + 1].ts <= ts {
                cursors[i] += 1;
            }
            let equity = if curve[cursors[i]].ts > ts {
                initial_capital
            } else {
                curve[cursors[i]].equity
            };
            sum += equity;
        }
        raw.push(sum / successes.len() as f64);
    }

    let shift = initial_capital - raw[0];
    timestamps
        .into_iter()
        .zip(raw)
        .map(|(ts, equity)| EquityPoint {
            ts,
            equity: equity + shift,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker_result::TickerAggregates;
    use crate::trade::ExitReason;

    fn ticker_result(symbol: &str, curve: Vec<(i64, f64)>, total_pnl: f64) -> TickerResult {
        TickerResult {
            symbol: symbol.to_string(),
            trades: Vec::new(),
            equity_curve: curve
                .into_iter()
                .map(|(ts, equity)| EquityPoint { ts, equity })
                .collect(),
            aggregates: TickerAggregates {
                total_pnl,
                ..TickerAggregates::default()
            },
            success: true,
            error: None,
            sandbox_failures: 0,
        }
    }

    #[test]
    fn failed_instruments_are_recorded_and_excluded() {
        let good = ticker_result("AAA", vec![(0, 100.0), (1, 110.0)], 10.0);
        let bad = TickerResult::failed("BBB", "non-finite bar");
        let result = compute_backtest_result(&[good, bad], 100.0, 20);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].symbol, "BBB");
        assert_eq!(result.tickers_simulated, 1);
    }

    #[test]
    fn empty_equity_curve_is_recorded_as_a_failure_and_excluded() {
        let good = ticker_result("AAA", vec![(0, 100.0), (1, 120.0)], 20.0);
        let empty = ticker_result("BBB", vec![], 0.0);
        let result = compute_backtest_result(&[good, empty], 100.0, 20);
        assert_eq!(result.tickers_simulated, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].symbol, "BBB");
        // The mean must not be pulled toward initial_capital by the
        // no-data instrument: with only AAA contributing, curve[1] == 120.
        assert!((result.equity_curve[1].equity - 120.0).abs() < 1e-9);
    }

    #[test]
    fn portfolio_curve_is_mean_rebased_to_initial_capital() {
        let a = ticker_result("AAA", vec![(0, 100.0), (1, 120.0)], 20.0);
        let b = ticker_result("BBB", vec![(0, 100.0), (1, 80.0)], -20.0);
        let result = compute_backtest_result(&[a, b], 100.0, 20);
        assert!((result.equity_curve[0].equity - 100.0).abs() < 1e-9);
        assert!((result.equity_curve[1].equity - 100.0).abs() < 1e-9);
    }

    #[test]
    fn top_and_worst_performers_are_sorted_and_cut() {
        let results: Vec<TickerResult> = (0..15)
            .map(|i| ticker_result(&format!("T{i}"), vec![(0, 100.0)], i as f64))
            .collect();
        let result = compute_backtest_result(&results, 100.0, 20);
        assert_eq!(result.top_performers.len(), 10);
        assert_eq!(result.top_performers[0].total_pnl, 14.0);
        assert_eq!(result.worst_performers[0].total_pnl, 0.0);
    }

    #[test]
    fn empty_results_produce_default_metrics() {
        let result = compute_backtest_result(&[], 100.0, 20);
        assert_eq!(result.metrics, Metrics::default());
        assert_eq!(result.tickers_simulated, 0);
    }

    #[test]
    fn sample_trades_are_most_recent_by_exit_time() {
        let mut r = ticker_result("AAA", vec![(0, 100.0)], 0.0);
        r.trades = (0..5)
            .map(|i| Trade {
                instrument: "AAA".into(),
                entry_time: i,
                entry_price: 100.0,
                exit_time: i,
                exit_price: 100.0,
                size: 1.0,
                pnl: 0.0,
                pnl_percent: 0.0,
                exit_reason: ExitReason::Signal,
            })
            .collect();
        let result = compute_backtest_result(&[r], 100.0, 3);
        assert_eq!(result.sample_trades.len(), 3);
        assert_eq!(result.sample_trades[0].exit_time, 4);
    }
}
