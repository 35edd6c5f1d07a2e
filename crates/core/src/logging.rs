//! Structured logging for the lift-call client.
//!
//! One subscriber per process, filtered by `RUST_LOG` (default `info`).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value. Anything other than `json` is pretty.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system with human readable output.
///
/// # Example
/// ```no_run
/// use liftcall_core::logging;
///
/// logging::init();
/// tracing::info!("client started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output, for log shipping.
pub fn init_json() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize with the given format.
pub fn init_with(format: LogFormat) {
    match format {
        LogFormat::Pretty => init(),
        LogFormat::Json => init_json(),
    }
}
