//! Logging bootstrap
//!
//! The engine only emits `tracing` events; hosts that do not install their
//! own subscriber can call [`init_tracing`].

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// configured level.
///
/// Returns `false` when a global subscriber was already installed; calling
/// this twice is harmless.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
