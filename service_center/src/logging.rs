//! Logging setup for the engine and the console runner
//!
//! The engine logs through `tracing`:
//! - INFO: start/stop of a run
//! - DEBUG: arrivals, dispatch decisions, service start/end
//! - TRACE: task exits
//!
//! `RUST_LOG` takes precedence over the level passed in, e.g.
//! `RUST_LOG=service_center=debug cargo run`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() {
    init_logging_with_level("info")
}

/// Install a global subscriber; later calls are ignored
pub fn init_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true),
        )
        .with(filter)
        .try_init();
}
