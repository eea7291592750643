//! Portfolio-level risk/return statistics.
//!
//! Pure functions over an equity curve and a trade ledger: annualized
//! return, volatility, risk-adjusted ratios, drawdown, and trade-level
//! aggregates, computed over the portfolio curve the aggregator builds.

use crate::trade::{EquityPoint, Trade};
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub total_return_percent: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub avg_trade_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub consecutive_wins: u32,
    pub consecutive_losses: u32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            total_return: 0.0,
            total_return_percent: 0.0,
            cagr: 0.0,
            volatility: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            avg_trade_pnl: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            consecutive_wins: 0,
            consecutive_losses: 0,
        }
    }
}

/// Compute the full metric vector from a portfolio equity curve and the
/// trades across all instruments that contributed to it.
pub fn compute_metrics(
    equity_curve: &[EquityPoint],
    trades: &[&Trade],
    initial_capital: f64,
) -> Metrics {
    if equity_curve.is_empty() {
        return Metrics::default();
    }

    let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(initial_capital);
    let total_return = final_equity - initial_capital;
    let total_return_percent = if initial_capital > 0.0 {
        total_return / initial_capital * 100.0
    } else {
        0.0
    };

    let years = fractional_years(equity_curve);
    let cagr = calculate_cagr(initial_capital, final_equity, years);

    let daily_returns = daily_returns(equity_curve);
    let volatility = calculate_volatility(&daily_returns);
    let sharpe_ratio = calculate_sharpe(&daily_returns);
    let sortino_ratio = calculate_sortino(&daily_returns);

    let (max_drawdown, max_drawdown_percent) =
        calculate_max_drawdown(&equity_curve.iter().map(|p| p.equity).collect::<Vec<_>>());

    let trade_stats = compute_trade_stats(trades);

    Metrics {
        total_return,
        total_return_percent,
        cagr,
        volatility,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        max_drawdown_percent,
        total_trades: trade_stats.total_trades,
        winning_trades: trade_stats.winning_trades,
        losing_trades: trade_stats.losing_trades,
        win_rate: trade_stats.win_rate,
        avg_win: trade_stats.avg_win,
        avg_loss: trade_stats.avg_loss,
        profit_factor: trade_stats.profit_factor,
        avg_trade_pnl: trade_stats.avg_trade_pnl,
        best_trade: trade_stats.best_trade,
        worst_trade: trade_stats.worst_trade,
        consecutive_wins: trade_stats.consecutive_wins,
        consecutive_losses: trade_stats.consecutive_losses,
    }
}

fn fractional_years(equity_curve: &[EquityPoint]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let first_ts = equity_curve.first().unwrap().ts;
    let last_ts = equity_curve.last().unwrap().ts;
    (last_ts - first_ts) as f64 / (365.25 * 86_400.0)
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter_map(|w| {
            if w[0].equity != 0.0 {
                Some((w[1].equity - w[0].equity) / w[0].equity)
            } else {
                None
            }
        })
        .collect()
}

pub fn calculate_cagr(initial: f64, final_value: f64, years: f64) -> f64 {
    if initial <= 0.0 || years <= 0.0 || final_value < 0.0 {
        return 0.0;
    }
    (final_value / initial).powf(1.0 / years) - 1.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Annualized volatility as a percentage.
pub fn calculate_volatility(daily_returns: &[f64]) -> f64 {
    if daily_returns.is_empty() {
        return 0.0;
    }
    let sd = stddev(daily_returns, mean(daily_returns));
    sd * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
}

pub fn calculate_sharpe(daily_returns: &[f64]) -> f64 {
    if daily_returns.is_empty() {
        return 0.0;
    }
    let m = mean(daily_returns);
    let sd = stddev(daily_returns, m);
    if sd == 0.0 {
        return 0.0;
    }
    m / sd * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn calculate_sortino(daily_returns: &[f64]) -> f64 {
    if daily_returns.is_empty() {
        return 0.0;
    }
    let m = mean(daily_returns);
    let downside: Vec<f64> = daily_returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let downside_sd = stddev(&downside, 0.0);
    if downside_sd == 0.0 {
        return 0.0;
    }
    m / downside_sd * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Returns `(max_drawdown, max_drawdown_percent)`.
pub fn calculate_max_drawdown(equity_curve: &[f64]) -> (f64, f64) {
    if equity_curve.is_empty() {
        return (0.0, 0.0);
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0;
    let mut max_dd_percent = 0.0;

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        let dd = peak - equity;
        if dd > max_dd {
            max_dd = dd;
            max_dd_percent = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
        }
    }

    (max_dd, max_dd_percent)
}

struct TradeStats {
    total_trades: usize,
    winning_trades: usize,
    losing_trades: usize,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    profit_factor: f64,
    avg_trade_pnl: f64,
    best_trade: f64,
    worst_trade: f64,
    consecutive_wins: u32,
    consecutive_losses: u32,
}

fn compute_trade_stats(trades: &[&Trade]) -> TradeStats {
    if trades.is_empty() {
        return TradeStats {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            avg_trade_pnl: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            consecutive_wins: 0,
            consecutive_losses: 0,
        };
    }

    let total_trades = trades.len();
    let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
    let winning_trades = wins.len();
    let losing_trades = losses.len();

    let win_rate = winning_trades as f64 / total_trades as f64;
    let avg_win = if winning_trades > 0 {
        wins.iter().sum::<f64>() / winning_trades as f64
    } else {
        0.0
    };
    let avg_loss = if losing_trades > 0 {
        losses.iter().sum::<f64>() / losing_trades as f64
    } else {
        0.0
    };

    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let avg_trade_pnl = total_pnl / total_trades as f64;

    let best_trade = trades.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max);
    let worst_trade = trades.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min);

    let (consecutive_wins, consecutive_losses) = longest_streaks(trades);

    TradeStats {
        total_trades,
        winning_trades,
        losing_trades,
        win_rate,
        avg_win,
        avg_loss,
        profit_factor,
        avg_trade_pnl,
        best_trade,
        worst_trade,
        consecutive_wins,
        consecutive_losses,
    }
}

/// Longest run of winning trades and longest run of losing trades, in the
/// order the ledger is given (by exit time, the caller's responsibility).
fn longest_streaks(trades: &[&Trade]) -> (u32, u32) {
    let mut best_win_streak = 0u32;
    let mut best_loss_streak = 0u32;
    let mut cur_win_streak = 0u32;
    let mut cur_loss_streak = 0u32;

    for t in trades {
        if t.pnl > 0.0 {
            cur_win_streak += 1;
            cur_loss_streak = 0;
        } else if t.pnl < 0.0 {
            cur_loss_streak += 1;
            cur_win_streak = 0;
        } else {
            cur_win_streak = 0;
            cur_loss_streak = 0;
        }
        best_win_streak = best_win_streak.max(cur_win_streak);
        best_loss_streak = best_loss_streak.max(cur_loss_streak);
    }

    (best_win_streak, best_loss_streak)
}
