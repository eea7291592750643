//! Logging setup for the CLI: a single stderr subscriber (the CLI is a
//! request-layer stand-in, not a long-running companion process, so file
//! rotation and cross-process log forwarding don't apply here).

use tracing_subscriber::{fmt, EnvFilter};

/// Reads `QUANTSIM_LOG` (default `info`) as an env-filter directive string.
pub fn init() {
    let filter = std::env::var("QUANTSIM_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
