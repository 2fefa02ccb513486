//! Error types for telemetry operations.

use thiserror::Error;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed, typically because another
    /// subscriber has already been installed globally.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall(#[source] tracing_subscriber::util::TryInitError),
    /// Building or registering a Prometheus collector failed.
    #[error("failed to register metrics collector: {name}")]
    MetricsRegister {
        /// Metric identifier tied to the failure.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },
    /// Encoding the metrics registry into the text exposition format failed.
    #[error("failed to encode metrics")]
    MetricsEncode(#[source] prometheus::Error),
    /// The encoded metrics buffer was not valid UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8(#[source] std::string::FromUtf8Error),
}
