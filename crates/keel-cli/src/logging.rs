//! Log output for the keel binary
//!
//! Logs go to stderr so they never mix with command output. The filter
//! comes from `KEEL_LOG` (same syntax as `RUST_LOG`); without it only
//! warnings are shown, or debug events with `--verbose`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "KEEL_LOG";

/// Install the global subscriber; later calls are no-ops
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "warn" };
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}
