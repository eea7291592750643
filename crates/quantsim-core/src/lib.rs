//! Quantsim Core - bars, position/decision/trade types, the per-instrument
//! simulator, and the portfolio metrics math for the quantsim backtester.
//!
//! This crate owns the data model, the per-instrument simulator, and the
//! aggregator/metrics math, plus the two external-collaborator traits
//! (`MarketDataProvider`, `UniverseResolver`) that the rest of the system
//! depends on but that live outside the core.

pub mod bar;
pub mod config;
pub mod data;
pub mod decision;
pub mod error;
pub mod metrics;
pub mod portfolio;
pub mod position;
pub mod simulator;
pub mod state;
pub mod ticker_result;
pub mod trade;
pub mod universe;

pub use bar::{Bar, Window};
pub use config::BacktestConfig;
pub use decision::{Decision, Signal};
pub use error::{ConfigError, SimulationError};
pub use metrics::Metrics;
pub use portfolio::{compute_backtest_result, BacktestResult, Failure, Performer};
pub use position::{Position, PositionState};
pub use simulator::{simulate_instrument, Decider, SimulatorParams};
pub use state::StrategyState;
pub use ticker_result::{TickerAggregates, TickerResult};
pub use trade::{EquityPoint, ExitReason, Trade};

/// Re-export of the types most callers need.
pub mod prelude {
    pub use crate::bar::{Bar, Window};
    pub use crate::config::BacktestConfig;
    pub use crate::data::{InMemoryProvider, MarketDataProvider};
    pub use crate::decision::{Decision, Signal};
    pub use crate::error::{ConfigError, SimulationError};
    pub use crate::portfolio::{compute_backtest_result, BacktestResult};
    pub use crate::simulator::{simulate_instrument, Decider, SimulatorParams};
    pub use crate::ticker_result::TickerResult;
    pub use crate::universe::{StaticUniverse, UniverseResolver};
}
