//! Logging setup for fashionbrain binaries.
//!
//! Library crates only emit `tracing` events; binaries call [`init`] once at
//! startup to install a subscriber.

use std::env;
use std::str::FromStr;

use time::{format_description, UtcOffset};
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;

/// Error type for telemetry initialisation failures.
///
/// Kept independent of `fashionbrain-core` so this crate has no internal
/// dependencies.
#[derive(Debug)]
pub enum TelemetryError {
    /// Provided log level string could not be parsed.
    InvalidLevel(String),

    /// Failed to configure the subscriber (should be rare).
    SubscriberInit(String),
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::InvalidLevel(level) => {
                write!(f, "invalid log level: {}", level)
            }
            TelemetryError::SubscriberInit(msg) => write!(f, "failed to init telemetry: {}", msg),
        }
    }
}

impl std::error::Error for TelemetryError {}

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Initialise the global logging subscriber.
///
/// `level` takes precedence over `RUST_LOG`; with neither set the filter
/// defaults to `"warn"` so CLI output stays clean unless asked otherwise.
/// Accepts plain levels (`"debug"`) and full filter expressions
/// (`"info,fashionbrain_client=debug"`).
///
/// Logs go to stderr so that stdout stays reserved for command output.
///
/// ```ignore
/// fashionbrain_telemetry::init(Some("debug"))?;
/// ```
pub fn init(level: Option<&str>) -> Result<()> {
    let filter = select_filter(level, env::var("RUST_LOG").is_ok())?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_timer(OffsetTime::new(
            // Falls back to UTC if the local offset cannot be determined.
            UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            format_description::parse(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]",
            )
            .or_else(|_| format_description::parse("[hour]:[minute]:[second]"))
            .unwrap_or_default(),
        ));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    Ok(())
}

/// Filter used when neither an explicit level nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "warn";

fn select_filter(level: Option<&str>, rust_log_set: bool) -> Result<EnvFilter> {
    match level {
        Some(level_str) => parse_level_filter(level_str),
        None if rust_log_set => Ok(EnvFilter::from_default_env()),
        None => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Parse a level string into an `EnvFilter`.
///
/// A plain `Level` becomes a global filter; anything else is handed to
/// `EnvFilter::builder()` as a full expression.
fn parse_level_filter(level_str: &str) -> Result<EnvFilter> {
    if Level::from_str(level_str).is_ok() {
        return Ok(EnvFilter::new(level_str));
    }

    EnvFilter::builder()
        .parse(level_str)
        .map_err(|e| TelemetryError::InvalidLevel(format!("{} ({})", level_str, e)))
}
