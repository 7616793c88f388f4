//! Logging setup.
//!
//! The provider logs through `tracing`. Every statement sent to the
//! executor is logged at `debug` with password literals redacted, lifecycle
//! completions at `info`, and drift at `warn`. Logs go to **stderr** so a
//! host reading stdout is not disturbed.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `snowflake_provider=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show every statement the provider executes
//! RUST_LOG=snowflake_provider=debug ./my-host
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(
    default_level: &str,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber at `info` unless `RUST_LOG`
/// says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// use snowflake_provider::init_logging_with_default;
///
/// // Log every statement if RUST_LOG is not set
/// init_logging_with_default("snowflake_provider=debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Unlike [`init_logging`], this does not panic when a subscriber is
/// already set, which suits tests and embedding hosts.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}
