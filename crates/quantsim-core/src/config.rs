//! Backtest request configuration.

use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn default_universe_id() -> String {
    "sp500".to_string()
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_sample_trades() -> usize {
    20
}

fn default_worker_count() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy_source: String,

    #[serde(default = "default_universe_id")]
    pub universe_id: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    pub initial_capital: f64,

    pub position_size: f64,

    /// Informational only; single-long-per-instrument is enforced
    /// regardless of this value.
    #[serde(default)]
    pub max_positions: Option<u32>,

    #[serde(default)]
    pub commission: f64,

    #[serde(default)]
    pub slippage: f64,

    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default)]
    pub universe_limit: Option<usize>,

    /// Cut for `BacktestResult.sample_trades`.
    #[serde(default = "default_sample_trades")]
    pub sample_trades_limit: usize,

    /// Bounded worker pool size `W` for the orchestrator.
    #[serde(default = "default_worker_count")]
    pub max_concurrency: usize,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_date <= self.start_date {
            return Err(ConfigError::EmptyDateRange {
                start: self.start_date.to_string(),
                end: self.end_date.to_string(),
            });
        }
        if !(self.initial_capital > 0.0) {
            return Err(ConfigError::InvalidInitialCapital(self.initial_capital));
        }
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(ConfigError::InvalidPositionSize(self.position_size));
        }
        if !(0.0..1.0).contains(&self.commission) {
            return Err(ConfigError::InvalidCommission(self.commission));
        }
        if !(0.0..1.0).contains(&self.slippage) {
            return Err(ConfigError::InvalidSlippage(self.slippage));
        }
        if let Some(limit) = self.universe_limit {
            if limit == 0 {
                return Err(ConfigError::InvalidUniverseLimit(limit));
            }
        }
        Ok(())
    }
}
