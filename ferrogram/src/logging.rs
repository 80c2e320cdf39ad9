//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`, defaulting to
/// `info` for everything and `debug` for the framework itself.
pub fn init() {
    init_with("info,ferrogram=debug");
}

/// Install a formatted subscriber with an explicit default filter.
///
/// `RUST_LOG` still wins when set. Safe to call more than once; later
/// calls are no-ops, which keeps tests independent of ordering.
pub fn init_with(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
