//! Quantsim Sandbox - the strategy sandbox contract: source
//! validation, compilation, and per-call invocation of untrusted strategy
//! scripts under a wall-clock budget, built on `rhai`.

pub mod engine;
pub mod error;
pub mod indicators;
pub mod validate;

pub use engine::{invoke, CompiledStrategy, SandboxDecider, DECIDE_BUDGET};
pub use error::{SandboxError, ValidationError};
pub use validate::validate;
