//! Logging
//!
//! Installs the global tracing subscriber. `RUST_LOG` takes precedence over
//! the configured level. Output goes to stderr so stdout stays machine-readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the filter from `RUST_LOG`, falling back to `level`
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the subscriber; returns false if one was already installed
pub fn init(level: &str) -> bool {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(level));

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
}
