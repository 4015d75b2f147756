//! Tracing subscriber setup.
//!
//! The engine itself only emits `tracing` events and spans. Binaries and
//! tests that want to see them install a subscriber with [`init_tracing`].
//! `RUST_LOG` is honoured; without it everything at `info` and above is
//! shown.

use crate::errors::WorkflowError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber with the default filter.
///
/// # Errors
///
/// Returns [`WorkflowError::Internal`] if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), WorkflowError> {
    init_tracing_with_filter(format, DEFAULT_LOG_FILTER)
}

/// Installs the global subscriber, using `default_filter` when `RUST_LOG`
/// is unset.
///
/// # Errors
///
/// Returns [`WorkflowError::Internal`] if a global subscriber is already set.
pub fn init_tracing_with_filter(format: LogFormat, default_filter: &str) -> Result<(), WorkflowError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    installed.map_err(|e| WorkflowError::Internal(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_config() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing(LogFormat::Json);
        let err = init_tracing(LogFormat::Pretty).unwrap_err();
        assert!(err.to_string().contains("tracing subscriber"));
    }
}
