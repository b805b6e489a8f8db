//! Structured logging setup using tracing
//!
//! One `init_logging` entry point builds the subscriber: an env-filter
//! (honoring `RUST_LOG`, defaulting to the crate at the requested level)
//! with either a compact human-readable layer or a JSON layer.
//!
//! # Example
//!
//! ```no_run
//! use shopsync::logging::init_logging;
//!
//! init_logging("info", false).expect("Failed to initialize logging");
//! tracing::info!(flow = "products", "starting");
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::{Result, SyncError};

/// Initialize the logging system.
///
/// # Arguments
///
/// * `log_level_str` - Log level as a string (trace, debug, info, warn, error)
/// * `json` - Emit JSON lines instead of the compact format
///
/// # Errors
///
/// Returns a configuration error for an unknown level string.
pub fn init_logging(log_level_str: &str, json: bool) -> Result<()> {
    let log_level = parse_log_level(log_level_str)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shopsync={log_level}")));

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!(level = %log_level, json, "logging initialized");
    Ok(())
}

/// Parse log level from string
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(SyncError::Configuration(format!(
            "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
            level_str
        ))),
    }
}
