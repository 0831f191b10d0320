//! Logging setup for the provider binary.
//!
//! Logs go to **stderr**; stdout carries only the handshake line.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (e.g. `info`, `debug`, `hemmer_provider_random=debug`)
//!
//! ```bash
//! # Trace every plan and apply
//! RUST_LOG=hemmer_provider_random=debug ./hemmer-provider-random
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

fn try_init_with(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
}

/// Install the stderr subscriber, filtered by `RUST_LOG` (default `info`).
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_FILTER);
}

/// Like [`init_logging`], with a custom filter for when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_filter: &str) {
    if let Err(e) = try_init_with(default_filter) {
        panic!("failed to install the logging subscriber: {}", e);
    }
}

/// Install the subscriber unless one is already set.
///
/// Returns `true` if this call installed it.
pub fn try_init_logging() -> bool {
    try_init_with(DEFAULT_FILTER).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_logging_is_idempotent() {
        // Other tests may have installed a subscriber first
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }

    #[test]
    fn test_env_filter_falls_back_to_default() {
        let filter = env_filter("warn");
        assert!(!filter.to_string().is_empty());
    }
}
