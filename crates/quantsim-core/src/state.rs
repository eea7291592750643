//! Opaque per-instrument strategy state.

use serde_json::{Map, Value};

/// A mutable, arbitrarily-shaped bag a strategy may read and write across
/// calls for one instrument. Reset to empty between instruments. Backed by
/// `serde_json::Value` so the simulator never has to know which scripting
/// engine the sandbox uses to interpret it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyState(Map<String, Value>);

impl StrategyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        assert!(StrategyState::new().as_map().is_empty());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut s = StrategyState::new();
        s.set("streak", Value::from(3));
        assert_eq!(s.get("streak"), Some(&Value::from(3)));
    }
}
