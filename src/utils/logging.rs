//! Diagnostic logging to stderr via tracing

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` for this crate
/// when `verbose` is on. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "warn,microdx=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
