//! Orchestrator-level error taxonomy.

use quantsim_core::error::ConfigError;
use quantsim_core::universe::UniverseError;
use quantsim_sandbox::ValidationError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("invalid backtest config: {0}")]
    Config(#[from] ConfigError),

    #[error("strategy source rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("universe resolution failed: {0}")]
    Universe(#[from] UniverseError),

    #[error("market data provider failed: {0}")]
    Data(String),

    /// Every instrument in the resolved universe failed or had no data,
    /// as distinct from the partial per-instrument failures recorded in
    /// `BacktestResult.failures`.
    #[error("all {0} instruments failed or had no data; no run to aggregate")]
    AllInstrumentsFailed(usize),
}
