//! Tracing setup for hosts embedding the engine.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the host's call. Content and secrets are never part of an event.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a fmt subscriber filtered by `RUST_LOG`, or `default_filter` when
/// the variable is unset.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()
        .is_ok()
}
