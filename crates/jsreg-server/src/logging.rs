//! Logging initialization for the server.
//!
//! Logging is owned by the binary crate; `jsreg-core` only emits events.

use miette::{IntoDiagnostic, Result};
use tracing::Level;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose level follows the `-v` flag.
const OWN_TARGETS: &[&str] = &["jsreg", "jsreg_core", "jsreg_server"];

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filter directives for `verbosity`, layered over `base` (usually `RUST_LOG`).
///
/// Request logging from `tower_http` stays at INFO unless `base` says
/// otherwise; unrelated crates default to WARN.
#[must_use]
pub fn directives(verbosity: u8, base: Option<&str>) -> String {
    let level = level_for(verbosity);
    let mut parts = vec![base.filter(|b| !b.trim().is_empty()).unwrap_or("warn").to_string()];
    if !base.is_some_and(|b| b.contains("tower_http")) {
        parts.push("tower_http=info".to_string());
    }
    parts.extend(OWN_TARGETS.iter().map(|target| format!("{target}={level}")));
    parts.join(",")
}

fn filter(verbosity: u8) -> Result<EnvFilter, ParseError> {
    let base = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    EnvFilter::try_new(directives(verbosity, base.as_deref()))
}

/// Install the global subscriber.
///
/// * `verbosity` - 0 = INFO, 1 = DEBUG, 2+ = TRACE for the jsreg crates
/// * `json` - one JSON object per line on stderr instead of the text format
///
/// # Errors
/// Fails if `RUST_LOG` holds an invalid directive or a subscriber is
/// already installed.
pub fn init(verbosity: u8, json: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(verbosity).into_diagnostic()?);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .into_diagnostic()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .into_diagnostic()
    }
}
