//! Logging setup
//!
//! Infrastructure code logs through `tracing`, the game layer through `log`.
//! One `tracing-subscriber` fmt subscriber collects both; `log` records are
//! bridged by the subscriber's `tracing-log` integration.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Directive used when `RUST_LOG` is unset
pub fn default_directive(configured: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else if configured.trim().is_empty() {
        "info".to_string()
    } else {
        configured.trim().to_string()
    }
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn init(configured: &str, verbose: bool) -> Result<()> {
    let directive = default_directive(configured, verbose);
    let filter = if verbose {
        EnvFilter::new(&directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialise logging: {}", e)))
}
