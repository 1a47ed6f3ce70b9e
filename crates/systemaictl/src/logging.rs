//! Diagnostic logging setup
//!
//! Diagnostics go to stderr so they never interleave with the child output
//! streamed to stdout. The action journal lives in `systemai_common::journal`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "SYSTEMAI_LOG";

/// Filter used when `SYSTEMAI_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
