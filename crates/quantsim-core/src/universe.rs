//! Ticker-universe resolver contract.
//!
//! The universe resolver is an external collaborator; this module
//! owns only the trait boundary plus a `StaticUniverse` fixture used for
//! tests and local CLI runs. Universe *data* is kept separate from the
//! resolution a request-handling layer would perform against it.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UniverseError {
    #[error("unknown universe: {0}")]
    Unknown(String),
}

/// Resolves a universe id (e.g. `"sp500"`) to a concrete symbol set.
pub trait UniverseResolver: Send + Sync {
    fn resolve(&self, universe_id: &str) -> Result<Vec<String>, UniverseError>;
}

/// A fixed, in-memory universe table. The default `"sp500"` universe ships
/// empty here deliberately: the real S&P 500 constituent list is the
/// external collaborator's data, not something this core fabricates.
#[derive(Debug, Clone, Default)]
pub struct StaticUniverse {
    universes: HashMap<String, Vec<String>>,
}

impl StaticUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_universe(mut self, id: impl Into<String>, symbols: Vec<String>) -> Self {
        self.universes.insert(id.into(), symbols);
        self
    }
}

impl UniverseResolver for StaticUniverse {
    fn resolve(&self, universe_id: &str) -> Result<Vec<String>, UniverseError> {
        self.universes
            .get(universe_id)
            .cloned()
            .ok_or_else(|| UniverseError::Unknown(universe_id.to_string()))
    }
}

/// Apply `config.universe_limit`, preserving order and de-duplicating. An
/// integer cap on instruments, intended for quick-test runs over a trimmed
/// universe.
pub fn apply_universe_limit(symbols: Vec<String>, limit: Option<usize>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(symbols.len());
    let deduped: Vec<String> = symbols.into_iter().filter(|s| seen.insert(s.clone())).collect();
    match limit {
        Some(n) => deduped.into_iter().take(n).collect(),
        None => deduped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_universe_is_an_error() {
        let universe = StaticUniverse::new();
        assert_eq!(
            universe.resolve("sp500"),
            Err(UniverseError::Unknown("sp500".to_string()))
        );
    }

    #[test]
    fn resolves_registered_universe() {
        let universe = StaticUniverse::new()
            .with_universe("quicktest", vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(
            universe.resolve("quicktest").unwrap(),
            vec!["AAA".to_string(), "BBB".to_string()]
        );
    }

    #[test]
    fn universe_limit_caps_and_dedupes() {
        let symbols = vec!["A".into(), "B".into(), "A".into(), "C".into()];
        assert_eq!(
            apply_universe_limit(symbols.clone(), Some(2)),
            vec!["A".to_string(), "B".to_string()]
        );
        assert_eq!(apply_universe_limit(symbols, None), vec!["A", "B", "C"]);
    }
}
