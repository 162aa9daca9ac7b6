//! Log setup for the CLI and hosts that do not install their own subscriber.
//!
//! Output always goes to stderr so JSON command output on stdout stays
//! machine-readable. `RUST_LOG` overrides the built-in filter.

use tracing_subscriber::{fmt, EnvFilter};

use crate::core::constants::env;

/// This crate at `info`, everything else at `warn`.
pub const DEFAULT_FILTER: &str = "warn,patternlock=info";

/// Per-transition recognizer and store traces.
pub const VERBOSE_FILTER: &str = "warn,patternlock=debug";

/// Install the global subscriber with `fallback` as the filter when
/// `RUST_LOG` is unset. `PATTERNLOCK_LOG_JSON=1` switches to JSON lines.
/// A second call is a no-op.
pub fn init_logging(fallback: &str) {
    let filter = filter_or(fallback);
    let json = std::env::var(env::LOG_JSON).is_ok_and(|value| value == "1");

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = if json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.compact().without_time().try_init()
    };
}

fn filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
