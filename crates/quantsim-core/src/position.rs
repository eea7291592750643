//! Position state for a single instrument (FLAT <-> LONG).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64,
    pub entry_time: i64,
    pub size: f64,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
}

impl Position {
    pub fn mark_to_close(&self, close: f64) -> f64 {
        self.size * close
    }
}

/// Per-instrument position state machine. `Flat` is both the initial and
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long(Position),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn as_position(&self) -> Option<&Position> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(p) => Some(p),
        }
    }
}
