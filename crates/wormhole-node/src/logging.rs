//! Tracing subscriber configuration for the relay.
//!
//! Log levels follow these conventions:
//! - ERROR: a relay direction stopped for good
//! - WARN: lost connections, frames dropped in flight, traffic log failures
//! - INFO: connections, accepts, forwarded frames
//! - DEBUG: connect attempts, suppressed duplicates
//! - TRACE: raw bytes and synchronizer resets

use tracing_subscriber::EnvFilter;

fn filter_or(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (usually the config
/// file's `[logging] level`) applies.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_level))
        .init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter_or(default_level))
        .init();
}

/// Pick plain or JSON output from `RUST_LOG_FORMAT`.
pub fn init_from_env(default_level: &str) {
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        init_json(default_level);
    } else {
        init(default_level);
    }
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("debug"))
        .with_test_writer()
        .try_init();
}
