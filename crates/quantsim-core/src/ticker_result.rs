//! Per-instrument simulation output and its derivable aggregates.

use crate::trade::{EquityPoint, Trade};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerAggregates {
    pub total_pnl: f64,
    pub win_rate: f64,
    pub best_trade: Option<f64>,
    pub worst_trade: Option<f64>,
    pub total_trades: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerResult {
    pub symbol: String,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub aggregates: TickerAggregates,
    /// False when the instrument aborted (data anomaly). Aggregation
    /// ignores unsuccessful instruments but records them in a failures
    /// list.
    pub success: bool,
    pub error: Option<String>,
    /// Count of `decide` calls that degraded to `NONE` due to a sandbox
    /// failure rather than a genuine strategy decision.
    pub sandbox_failures: u32,
}

impl TickerResult {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            aggregates: TickerAggregates::default(),
            success: true,
            error: None,
            sandbox_failures: 0,
        }
    }

    pub fn failed(symbol: &str, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            aggregates: TickerAggregates::default(),
            success: false,
            error: Some(message.into()),
            sandbox_failures: 0,
        }
    }
}

/// Derive aggregates purely from a trade ledger.
pub fn compute_aggregates(trades: &[Trade]) -> TickerAggregates {
    if trades.is_empty() {
        return TickerAggregates::default();
    }

    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let winners = trades.iter().filter(|t| t.pnl > 0.0).count();
    let win_rate = winners as f64 / trades.len() as f64;
    let best_trade = trades.iter().map(|t| t.pnl).fold(None, |acc, pnl| {
        Some(acc.map_or(pnl, |m: f64| m.max(pnl)))
    });
    let worst_trade = trades.iter().map(|t| t.pnl).fold(None, |acc, pnl| {
        Some(acc.map_or(pnl, |m: f64| m.min(pnl)))
    });

    TickerAggregates {
        total_pnl,
        win_rate,
        best_trade,
        worst_trade,
        total_trades: trades.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::ExitReason;

    fn trade(pnl: f64) -> Trade {
        Trade {
            instrument: "TEST".into(),
            entry_time: 0,
            entry_price: 100.0,
            exit_time: 1,
            exit_price: 100.0 + pnl,
            size: 1.0,
            pnl,
            pnl_percent: pnl,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn empty_ledger_has_zeroed_aggregates() {
        assert_eq!(compute_aggregates(&[]), TickerAggregates::default());
    }

    #[test]
    fn aggregates_sum_and_rank_trades() {
        let trades = vec![trade(10.0), trade(-5.0), trade(3.0)];
        let agg = compute_aggregates(&trades);
        assert!((agg.total_pnl - 8.0).abs() < 1e-9);
        assert!((agg.win_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(agg.best_trade, Some(10.0));
        assert_eq!(agg.worst_trade, Some(-5.0));
        assert_eq!(agg.total_trades, 3);
    }
}
