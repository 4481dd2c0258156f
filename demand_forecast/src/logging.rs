//! Tracing setup for binaries

use std::env;
use tracing_subscriber::EnvFilter;

/// Default filter level when neither `RUST_LOG` nor a level is given
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Filter directive for `level`, unless `RUST_LOG` is set and non-empty
pub fn filter_directive(level: Option<&str>) -> String {
    env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| level.unwrap_or(DEFAULT_LOG_LEVEL).to_string())
}

/// Install a stderr subscriber; stdout is left to the program's output
///
/// Calling this more than once is harmless, only the first call installs.
pub fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_new(filter_directive(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
