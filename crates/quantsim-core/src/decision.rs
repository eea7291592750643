//! The strategy's per-bar return value and the stop/target interpretation rule.

use serde::{Deserialize, Serialize};

/// The strategy's directive for the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Flat,
    Hold,
    #[default]
    None,
}

/// Value object returned by the sandbox once per bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Decision {
    pub signal: Signal,
    /// Optional size multiplier in (0, 1], scaling the normal entry size.
    pub size_multiplier: Option<f64>,
    /// Raw stop-loss value as returned by the strategy, multiplier or
    /// absolute price (see `resolve_stop_or_target`).
    pub stop_loss: Option<f64>,
    /// Raw take-profit value, same ambiguity as `stop_loss`.
    pub take_profit: Option<f64>,
}

impl Decision {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn buy() -> Self {
        Self {
            signal: Signal::Buy,
            ..Self::default()
        }
    }
}

/// Upper band for treating a stop/target value as a multiplier rather than
/// an absolute price. Named and kept stable so strategies can rely on it.
pub const STOP_TARGET_BAND_UPPER: f64 = 3.0;

/// Tolerance around 1.0 a candidate multiplier must fall within.
pub const STOP_TARGET_MULTIPLIER_TOL: f64 = 0.5;

/// Resolve a strategy-supplied stop/target value against an entry price.
///
/// Rule: if `0 < value < STOP_TARGET_BAND_UPPER` AND
/// `|value - 1| < STOP_TARGET_MULTIPLIER_TOL`, treat as a multiplier of
/// `entry_price`; otherwise treat the value as an absolute price.
pub fn resolve_stop_or_target(value: f64, entry_price: f64) -> f64 {
    if value > 0.0
        && value < STOP_TARGET_BAND_UPPER
        && (value - 1.0).abs() < STOP_TARGET_MULTIPLIER_TOL
    {
        entry_price * value
    } else {
        value
    }
}
