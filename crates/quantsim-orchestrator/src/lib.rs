//! Quantsim Orchestrator - bounded-concurrency execution across a resolved
//! universe and the streaming event protocol.

pub mod error;
pub mod event;
pub mod orchestrator;
pub mod worker;

pub use error::OrchestratorError;
pub use event::Event;
pub use orchestrator::{run, run_streaming, RunHandle};
