//! Tracing bootstrap for binaries and tests.
//!
//! The engine logs every phase (fan-out, barrier, merge, routing,
//! termination) through [`tracing`]; this module installs a formatting
//! subscriber so those logs become visible. Filtering follows `RUST_LOG`,
//! defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
