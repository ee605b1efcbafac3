//! Observability infrastructure for Numera.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors for consistent observability
//! across all Numera components.

use std::fmt;
use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `numera_registry=debug`)
///
/// # Example
///
/// ```rust
/// use numera_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(subscriber_fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(subscriber_fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for registry write operations with standard fields.
///
/// # Example
///
/// ```rust
/// use numera_core::observability::registry_span;
///
/// let span = registry_span("sell_number", "admin@example.com");
/// let _guard = span.enter();
/// // ... perform the mutation
/// ```
#[must_use]
pub fn registry_span(operation: &str, actor: &str) -> Span {
    tracing::info_span!("registry", op = operation, actor = actor)
}

/// Creates a span for background scheduler jobs.
#[must_use]
pub fn scheduler_span(job: &str) -> Span {
    tracing::info_span!("scheduler", job = job)
}

/// Wrapper that hides a secret from `Debug` output.
///
/// Used for bearer tokens and webhook secrets held in configuration.
#[derive(Clone)]
pub struct Redacted<T>(T);

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl<T> Redacted<T> {
    /// Wraps a secret value.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Returns the wrapped secret.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_succeeds() {
        // Should not panic (uses Once internally)
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty); // Second call should be no-op
    }

    #[test]
    fn test_span_helper_creates_span() {
        let span = registry_span("sell_number", "tester");
        let _guard = span.enter();
        tracing::info!("test message in span");
    }

    #[test]
    fn redacted_hides_value() {
        let secret = Redacted::new("hunter2".to_string());
        assert_eq!(format!("{secret:?}"), "[redacted]");
        assert_eq!(secret.expose(), "hunter2");
    }
}
