//! Structured logging utilities for scriptcache
//!
//! All logs use structured fields for easy parsing and analysis.
//!
//! # Log Format Conventions
//!
//! - `service`: The component emitting the event ("script.cache")
//! - `operation`: The step being performed ("resolve", "fetch", "inject", ...)
//! - `status`: The result status ("hit", "miss", "stale", "error", ...)
//! - `key`: Script name used as the store key
//! - `url`: Script source URL
//! - `size_bytes`: Size in bytes
//!
//! # Examples
//!
//! ```rust
//! use scriptcache::logging::{operations, services, status};
//! use tracing::info;
//!
//! let key = "lib";
//! info!(
//!     service = services::SCRIPT_CACHE,
//!     operation = operations::RESOLVE,
//!     status = status::HIT,
//!     key = key,
//!     "cache hit"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Shows "scriptcache" instead of the full module path
struct ScriptcacheFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for ScriptcacheFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m", // Red
                tracing::Level::WARN => "\x1b[33m",  // Yellow
                tracing::Level::INFO => "\x1b[32m",  // Green
                tracing::Level::DEBUG => "\x1b[34m", // Blue
                tracing::Level::TRACE => "\x1b[35m", // Magenta
            };
            write!(
                writer,
                "{}{:5}(scriptcache)\x1b[0m: ",
                level_style,
                meta.level()
            )?;
        } else {
            write!(writer, "{:5}(scriptcache): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    Pretty,
    /// Compact format (for CI/production)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    pub fn parse(value: &str, in_ci: bool) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if in_ci => Self::Compact,
            _ => Self::Pretty,
        }
    }

    /// Parse from environment variable (SCRIPTCACHE_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            &std::env::var("SCRIPTCACHE_LOG_FORMAT").unwrap_or_default(),
            std::env::var("CI").is_ok(),
        )
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "debug", "info", "warn"); overrides `default_level`
/// - `SCRIPTCACHE_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
///
/// Logs go to stderr so rendered output on stdout stays clean.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding hosts)
    let result = match LogFormat::from_env() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(ScriptcacheFormatter { with_ansi: true })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(ScriptcacheFormatter { with_ansi: false })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("tracing subscriber already set: {}", e);
    }
}

/// Service names for consistent logging
pub mod services {
    pub const SCRIPT_CACHE: &str = "script.cache";
}

/// Operation names for consistent logging
pub mod operations {
    pub const RESOLVE: &str = "resolve";
    pub const FETCH: &str = "fetch";
    pub const PUT: &str = "put";
    pub const INJECT: &str = "inject";
    pub const FALLBACK: &str = "fallback";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const HIT: &str = "hit";
    pub const MISS: &str = "miss";
    pub const STALE: &str = "stale";
    pub const MALFORMED: &str = "malformed";
    pub const ERROR: &str = "error";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON", false), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact", false), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty", true), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("", true), LogFormat::Compact);
        assert_eq!(LogFormat::parse("whatever", false), LogFormat::Pretty);
    }

    #[test]
    #[serial]
    fn test_log_format_from_env() {
        std::env::set_var("SCRIPTCACHE_LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var("SCRIPTCACHE_LOG_FORMAT", "compact");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);

        std::env::remove_var("SCRIPTCACHE_LOG_FORMAT");
    }
}
