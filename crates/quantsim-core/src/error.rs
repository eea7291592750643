//! Error taxonomy for the quantsim core.

use thiserror::Error;

/// Configuration errors: surfaced synchronously, no worker started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unparseable date: {0}")]
    UnparseableDate(String),

    #[error("date range is empty: start {start} is not before end {end}")]
    EmptyDateRange { start: String, end: String },

    #[error("unknown universe: {0}")]
    UnknownUniverse(String),

    #[error("initial_capital must be > 0, got {0}")]
    InvalidInitialCapital(f64),

    #[error("position_size must be in (0, 1], got {0}")]
    InvalidPositionSize(f64),

    #[error("commission must be in [0, 1), got {0}")]
    InvalidCommission(f64),

    #[error("slippage must be in [0, 1), got {0}")]
    InvalidSlippage(f64),

    #[error("universe_limit must be > 0 when set, got {0}")]
    InvalidUniverseLimit(usize),
}

/// Per-instrument or whole-run error surfaced by the simulator or
/// orchestrator. `DataUnavailable` for a single instrument is recovered by
/// skipping that instrument; `DataUnavailable` for the whole universe is
/// terminal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("no bars available for {symbol}")]
    DataUnavailable { symbol: String },

    #[error("non-finite or malformed bar for {symbol} at index {index}")]
    NumericAnomaly { symbol: String, index: usize },
}

/// Result alias used throughout `quantsim-core`.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
