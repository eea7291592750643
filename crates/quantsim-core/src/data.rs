//! Market data provider contract.
//!
//! The historical-data provider and its on-disk cache are explicitly out of
//! scope for the core; this module only owns the trait boundary and a
//! fixture implementation used by the CLI and this crate's own tests. The
//! real provider and its network fetching live entirely outside this crate.

use crate::bar::Bar;
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("no data available for universe {universe_id}")]
    UniverseUnavailable { universe_id: String },

    #[error("provider fetch failed: {0}")]
    FetchFailed(String),
}

/// Given (universe_id, start, end, interval), returns a mapping from
/// instrument symbol to a chronologically ordered bar sequence. May return
/// partial coverage; an absent or empty series for a symbol is a skipped
/// instrument, not an error.
pub trait MarketDataProvider: Send + Sync {
    fn load_bars(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<HashMap<String, Vec<Bar>>, DataError>;
}

/// A fixture provider backed by an in-memory map, used by `quantsim-cli`
/// for local CSV-backed runs and by this crate's own tests. Never the
/// production data path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    bars: HashMap<String, Vec<Bar>>,
}

impl InMemoryProvider {
    pub fn new(bars: HashMap<String, Vec<Bar>>) -> Self {
        Self { bars }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn load_bars(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        _interval: &str,
    ) -> Result<HashMap<String, Vec<Bar>>, DataError> {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();

        let mut out = HashMap::new();
        for symbol in symbols {
            if let Some(series) = self.bars.get(symbol) {
                let windowed: Vec<Bar> = series
                    .iter()
                    .copied()
                    .filter(|b| b.ts >= start_ts && b.ts <= end_ts)
                    .collect();
                out.insert(symbol.clone(), windowed);
            }
        }
        Ok(out)
    }
}
