//! Sandbox error taxonomy.

use thiserror::Error;

/// Surfaced synchronously from `validate`; no worker is ever started for a
/// strategy that fails validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("script failed to parse: {0}")]
    ParseError(String),

    #[error("forbidden construct at line {line}: {reason}")]
    Forbidden { reason: String, line: usize },

    #[error("strategy source must define a `decide` function with exactly two parameters")]
    MissingDecide,
}

/// Per-call failure from `invoke`. `Timeout` and
/// `Exception`/`MalformedReturn` are recovered locally by the simulator as
/// `Signal::None`; `Fatal` terminates the
/// worker and marks the instrument failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SandboxError {
    #[error("decide call exceeded its wall-clock budget")]
    Timeout,

    #[error("script raised an exception: {0}")]
    Exception(String),

    #[error("decide returned a value that could not be interpreted as a decision: {0}")]
    MalformedReturn(String),

    #[error("sandbox terminated: {0}")]
    Fatal(String),
}
