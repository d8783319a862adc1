//! Logging setup for the binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the executables.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `info` (or `debug` for this crate when `debug` is set).
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_logging(debug: bool) {
    let default_filter = if debug { "info,hushfall=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .try_init();
}
