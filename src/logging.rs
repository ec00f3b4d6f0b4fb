//! Logging setup.
//!
//! The provider logs through `tracing`. These helpers install a subscriber
//! that writes to **stderr**, so an engine that reads the provider's stdout
//! is not disturbed.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `pingone_provider=debug`)
//!
//! Request attempts are logged at `debug`, retries and permission
//! propagation at `warn`:
//!
//! ```bash
//! RUST_LOG=pingone_provider::client=debug ./engine plan
//! ```
//!
//! Access tokens and client secrets are never logged.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives applied after the default level. The HTTP stack is chatty at
/// `debug` and says nothing useful about PingOne calls.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = std::iter::once(default_level)
            .chain(QUIET_DEPENDENCIES.iter().copied())
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(directives)
    })
}

fn try_init_with(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(default_level))
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

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with `default_level` used when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// pingone_provider::init_logging_with_default("debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    if let Err(e) = try_init_with(default_level) {
        panic!("failed to install the logging subscriber: {}", e);
    }
}

/// Try to initialize logging, returning false if a subscriber was already set.
///
/// Useful in tests, where several cases may race to install one.
pub fn try_init_logging() -> bool {
    try_init_with("info").is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // filter construction is tested here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("pingone_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,pingone_provider::client=debug").is_ok());
    }

    #[test]
    fn test_default_filter_quiets_http_stack() {
        let rendered = filter("debug").to_string();
        if std::env::var("RUST_LOG").is_err() {
            assert!(rendered.contains("reqwest=warn"));
            assert!(rendered.contains("debug"));
        }
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
