//! Bar (OHLCV) data types and the read-only rolling window handed to strategies.

use serde::{Deserialize, Serialize};

/// A single OHLCV bar for one instrument.
///
/// `ts` is a monotonically increasing bar index within an instrument's
/// series (Unix seconds for daily bars, but the simulator never assumes a
/// particular unit; only strict ordering matters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True if every OHLC field is finite and `low <= open,close <= high`.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
            && self.open > 0.0
            && self.high > 0.0
            && self.low > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }
}

/// A read-only view of all bars of one instrument up to and including a
/// given index. Borrowed, so it cannot outlive the `decide` call it backs.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub symbol: &'a str,
    bars: &'a [Bar],
}

impl<'a> Window<'a> {
    pub fn new(symbol: &'a str, bars: &'a [Bar]) -> Self {
        Self { symbol, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    /// The most recent bar in the window (the bar the decision is made on).
    pub fn current(&self) -> &'a Bar {
        self.bars
            .last()
            .expect("window is constructed with at least one bar")
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

/// Validate the monotonicity and OHLC invariants required of a full
/// instrument bar sequence. Returns the index of the first violation.
pub fn find_first_anomaly(bars: &[Bar]) -> Option<usize> {
    let mut prev_ts: Option<i64> = None;
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_well_formed() {
            return Some(i);
        }
        if let Some(p) = prev_ts {
            if bar.ts <= p {
                return Some(i);
            }
        }
        prev_ts = Some(bar.ts);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(ts, o, h, l, c, 1_000.0)
    }

    #[test]
    fn well_formed_bar_passes() {
        assert!(bar(1, 100.0, 105.0, 99.0, 103.0).is_well_formed());
    }

    #[test]
    fn low_above_open_is_malformed() {
        assert!(!bar(1, 100.0, 105.0, 101.0, 103.0).is_well_formed());
    }

    #[test]
    fn non_finite_price_is_malformed() {
        assert!(!bar(1, f64::NAN, 105.0, 99.0, 103.0).is_well_formed());
    }

    #[test]
    fn find_first_anomaly_detects_non_increasing_timestamps() {
        let bars = vec![bar(1, 1.0, 1.0, 1.0, 1.0), bar(1, 1.0, 1.0, 1.0, 1.0)];
        assert_eq!(find_first_anomaly(&bars), Some(1));
    }

    #[test]
    fn window_current_is_last_bar() {
        let bars = vec![bar(1, 1.0, 2.0, 0.5, 1.5), bar(2, 1.5, 2.5, 1.0, 2.0)];
        let w = Window::new("TEST", &bars);
        assert_eq!(w.current().close, 2.0);
        assert_eq!(w.len(), 2);
    }
}
