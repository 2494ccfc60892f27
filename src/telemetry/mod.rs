//! Tracing bootstrap.
//!
//! Call [`init`] once at startup to wire `tracing-subscriber` with an
//! environment filter (`RUST_LOG`). Safe to call more than once; later
//! calls are no-ops.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber with env-filter support.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
