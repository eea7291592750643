//! Compilation and per-call invocation of a validated strategy.
//!
//! Grounded on `rhai`'s own sandboxing guidance: a hardened `Engine` (no
//! standard library, explicit operation/size limits) plus a compiled `AST`
//! that is cheap to clone into each worker. The wall-clock budget is
//! enforced with `Engine::on_progress`, which `rhai` polls periodically
//! during script execution.

use crate::error::SandboxError;
use crate::indicators;
use quantsim_core::bar::Window;
use quantsim_core::decision::{Decision, Signal};
use quantsim_core::simulator::Decider;
use quantsim_core::state::StrategyState;
use rhai::{Array, Dynamic, Engine, Map, Scope, AST};
use std::time::Instant;

/// Wall-clock budget per `decide` call: 5 seconds.
pub const DECIDE_BUDGET: std::time::Duration = std::time::Duration::from_secs(5);

/// A validated, compiled strategy. `Clone` is cheap: `AST` is internally
/// reference-counted and `Engine` clones its (already-built) function
/// tables rather than re-registering anything, so no re-parsing happens
/// when a `CompiledStrategy` is handed to a new worker.
#[derive(Clone)]
pub struct CompiledStrategy {
    pub(crate) engine: Engine,
    pub(crate) ast: AST,
}

/// Build the hardened engine shared by validation and invocation: no
/// preloaded standard library, a capped expression depth, operation count,
/// and string/array/map sizes, plus the
/// whitelisted numeric utilities.
pub fn build_engine() -> Engine {
    let mut engine = Engine::new_raw();

    engine.set_max_expr_depths(32, 32);
    engine.set_max_operations(2_000_000);
    engine.set_max_string_size(4_096);
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(1_000);
    engine.set_max_call_levels(16);

    engine
        .register_fn("sma", |values: Array, period: i64| -> Array {
            to_dynamic_array(&indicators::sma(&to_f64_vec(&values), period))
        })
        .register_fn("ema", |values: Array, period: i64| -> Array {
            to_dynamic_array(&indicators::ema(&to_f64_vec(&values), period))
        })
        .register_fn("rsi", |closes: Array, period: i64| -> Array {
            to_dynamic_array(&indicators::rsi(&to_f64_vec(&closes), period))
        })
        .register_fn(
            "bollinger_bands",
            |values: Array, period: i64, mult: f64| -> Map {
                let (lower, middle, upper) =
                    indicators::bollinger_bands(&to_f64_vec(&values), period, mult);
                let mut map = Map::new();
                map.insert("lower".into(), Dynamic::from(to_dynamic_array(&lower)));
                map.insert("middle".into(), Dynamic::from(to_dynamic_array(&middle)));
                map.insert("upper".into(), Dynamic::from(to_dynamic_array(&upper)));
                map
            },
        )
        .register_fn(
            "atr",
            |highs: Array, lows: Array, closes: Array, period: i64| -> Array {
                to_dynamic_array(&indicators::atr(
                    &to_f64_vec(&highs),
                    &to_f64_vec(&lows),
                    &to_f64_vec(&closes),
                    period,
                ))
            },
        )
        .register_fn(
            "vwap",
            |highs: Array, lows: Array, closes: Array, volumes: Array| -> Array {
                to_dynamic_array(&indicators::vwap(
                    &to_f64_vec(&highs),
                    &to_f64_vec(&lows),
                    &to_f64_vec(&closes),
                    &to_f64_vec(&volumes),
                ))
            },
        );

    engine
}

/// The function names registered on the sandbox engine; used by `validate::check_forbidden_calls` to
/// decide which identifiers a script may reference.
pub const WHITELISTED_FUNCTIONS: &[&str] =
    &["sma", "ema", "rsi", "bollinger_bands", "atr", "vwap"];

fn to_f64_vec(arr: &Array) -> Vec<f64> {
    arr.iter().map(|d| d.as_float().unwrap_or(0.0)).collect()
}

fn to_dynamic_array(values: &[f64]) -> Array {
    values.iter().map(|v| Dynamic::from_float(*v)).collect()
}

fn window_to_dynamic(window: Window<'_>) -> Map {
    let mut map = Map::new();
    map.insert("open".into(), Dynamic::from(to_dynamic_array(&window.opens())));
    map.insert("high".into(), Dynamic::from(to_dynamic_array(&window.highs())));
    map.insert("low".into(), Dynamic::from(to_dynamic_array(&window.lows())));
    map.insert("close".into(), Dynamic::from(to_dynamic_array(&window.closes())));
    map.insert("volume".into(), Dynamic::from(to_dynamic_array(&window.volumes())));
    map.insert("symbol".into(), Dynamic::from(window.symbol.to_string()));
    map
}

fn state_to_dynamic(state: &StrategyState) -> Map {
    let mut map = Map::new();
    for (key, value) in state.as_map() {
        map.insert(key.as_str().into(), json_to_dynamic(value));
    }
    map
}

fn json_to_dynamic(value: &serde_json::Value) -> Dynamic {
    match value {
        serde_json::Value::Null => Dynamic::UNIT,
        serde_json::Value::Bool(b) => Dynamic::from_bool(*b),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Dynamic::from_float)
            .unwrap_or(Dynamic::UNIT),
        serde_json::Value::String(s) => Dynamic::from(s.clone()),
        serde_json::Value::Array(items) => {
            Dynamic::from(items.iter().map(json_to_dynamic).collect::<Array>())
        }
        serde_json::Value::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from(map)
        }
    }
}

fn dynamic_to_json(value: &Dynamic) -> serde_json::Value {
    if value.is_unit() {
        serde_json::Value::Null
    } else if let Some(b) = value.clone().try_cast::<bool>() {
        serde_json::Value::Bool(b)
    } else if let Some(f) = value.clone().try_cast::<rhai::FLOAT>() {
        serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(i) = value.clone().try_cast::<rhai::INT>() {
        serde_json::Value::Number(i.into())
    } else if let Some(s) = value.clone().try_cast::<rhai::ImmutableString>() {
        serde_json::Value::String(s.to_string())
    } else if let Some(arr) = value.clone().try_cast::<Array>() {
        serde_json::Value::Array(arr.iter().map(dynamic_to_json).collect())
    } else if let Some(map) = value.clone().try_cast::<Map>() {
        let mut obj = serde_json::Map::new();
        for (k, v) in map.iter() {
            obj.insert(k.to_string(), dynamic_to_json(v));
        }
        serde_json::Value::Object(obj)
    } else {
        serde_json::Value::Null
    }
}

fn signal_from_str(raw: &str) -> Signal {
    match raw.to_ascii_uppercase().as_str() {
        "BUY" => Signal::Buy,
        "SELL" => Signal::Sell,
        "FLAT" => Signal::Flat,
        "HOLD" => Signal::Hold,
        // Unrecognized or missing signal is treated as NONE.
        _ => Signal::None,
    }
}

/// Parse a `decide` return value into a `Decision`. Anything that is not a
/// map, or a map missing/with an unrecognized `signal`, degrades to
/// `Signal::None` rather than erroring.
///
/// A `state` key in the returned map, if present, is threaded back into the
/// caller's `StrategyState`: `rhai::Engine::call_fn` passes arguments by
/// value, so mutation of the `state` parameter inside the script is not
/// observable by the caller unless the script explicitly returns the
/// (possibly updated) state this way.
fn parse_decision(value: Dynamic, state: &mut StrategyState) -> Decision {
    let Some(map) = value.try_cast::<Map>() else {
        return Decision::none();
    };

    if let Some(returned_state) = map.get("state") {
        if let serde_json::Value::Object(obj) = dynamic_to_json(returned_state) {
            *state = StrategyState::from_map(obj);
        }
    }

    let signal = map
        .get("signal")
        .and_then(|d| d.clone().into_immutable_string().ok())
        .map(|s| signal_from_str(s.as_str()))
        .unwrap_or(Signal::None);

    let size_multiplier = map.get("size_multiplier").and_then(|d| d.as_float().ok());
    let stop_loss = map.get("stop_loss").and_then(|d| d.as_float().ok());
    let take_profit = map.get("take_profit").and_then(|d| d.as_float().ok());

    Decision {
        signal,
        size_multiplier,
        stop_loss,
        take_profit,
    }
}

/// Invoke `decide(window, state)` under the per-call wall-clock budget. A
/// breach, thrown exception, or malformed return all surface as
/// `Ok(Decision::none())` to the simulator, while the `Result`'s `Err` arm
/// carries the typed `SandboxError` for the caller to log.
pub fn invoke(
    compiled: &CompiledStrategy,
    window: Window<'_>,
    state: &mut StrategyState,
) -> Result<Decision, SandboxError> {
    let deadline = Instant::now() + DECIDE_BUDGET;
    let mut call_engine = compiled.engine.clone();
    call_engine.on_progress(move |_ops| {
        if Instant::now() >= deadline {
            Some(Dynamic::from("decide exceeded its wall-clock budget"))
        } else {
            None
        }
    });

    let mut scope = Scope::new();
    let window_arg = Dynamic::from(window_to_dynamic(window));
    let state_arg = Dynamic::from(state_to_dynamic(state));

    match call_engine.call_fn::<Dynamic>(&mut scope, &compiled.ast, "decide", (window_arg, state_arg)) {
        Ok(value) => Ok(parse_decision(value, state)),
        Err(err) => {
            let message = err.to_string();
            Err(if message.contains("wall-clock budget") {
                SandboxError::Timeout
            } else {
                SandboxError::Exception(message)
            })
        }
    }
}

/// Adapts a `CompiledStrategy` to `quantsim_core::simulator::Decider`,
/// degrading any `SandboxError` to `Signal::None` at the call boundary
/// while counting failures for the `TickerResult`.
pub struct SandboxDecider<'a> {
    compiled: &'a CompiledStrategy,
    symbol: String,
    failures: u32,
}

impl<'a> SandboxDecider<'a> {
    pub fn new(compiled: &'a CompiledStrategy, symbol: impl Into<String>) -> Self {
        Self {
            compiled,
            symbol: symbol.into(),
            failures: 0,
        }
    }
}

impl<'a> Decider for SandboxDecider<'a> {
    fn decide(&mut self, window: Window<'_>, state: &mut StrategyState) -> Decision {
        match invoke(self.compiled, window, state) {
            Ok(decision) => decision,
            Err(err) => {
                self.failures += 1;
                tracing::warn!(
                    symbol = %self.symbol,
                    error = %err,
                    "sandbox call failed, degrading to NONE"
                );
                Decision::none()
            }
        }
    }

    fn sandbox_failures(&self) -> u32 {
        self.failures
    }
}
