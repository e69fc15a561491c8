//! Tracing initialization.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Initializes the tracing subscriber for library consumers that do not
/// install their own.
///
/// Respects `RUST_LOG`; defaults to `info` for this crate. Safe to call more
/// than once: subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crosscheck=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
