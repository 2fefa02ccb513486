//! Application-level error type for bootstrap and orchestration.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required environment configuration was missing.
    #[error("missing environment variable {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Connecting to or migrating the database failed.
    #[error("database setup failed: {operation}")]
    Database {
        /// Operation identifier, for logs.
        operation: &'static str,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },
    /// Opening the store against an already-connected pool failed.
    #[error("store setup failed: {operation}")]
    Store {
        /// Operation identifier, for logs.
        operation: &'static str,
        /// Underlying store error.
        #[source]
        source: speedgov_data::DataError,
    },
    /// Constructing the metrics registry failed.
    #[error("metrics setup failed: {operation}")]
    Metrics {
        /// Operation identifier, for logs.
        operation: &'static str,
        /// Underlying telemetry error.
        #[source]
        source: speedgov_telemetry::TelemetryError,
    },
    /// The governor engine failed to start or stop.
    #[error("governor engine operation failed: {operation}")]
    Governor {
        /// Operation identifier, for logs.
        operation: &'static str,
        /// Underlying governor error.
        #[source]
        source: speedgov_governor::GovernorError,
    },
    /// The auto-remove engine failed to start or stop.
    #[error("auto-remove engine operation failed: {operation}")]
    AutoRemove {
        /// Operation identifier, for logs.
        operation: &'static str,
        /// Underlying auto-remove error.
        #[source]
        source: speedgov_autoremove::AutoRemoveError,
    },
}

impl AppError {
    pub(crate) const fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }

    pub(crate) const fn store(operation: &'static str, source: speedgov_data::DataError) -> Self {
        Self::Store { operation, source }
    }

    pub(crate) const fn governor(operation: &'static str, source: speedgov_governor::GovernorError) -> Self {
        Self::Governor { operation, source }
    }

    pub(crate) const fn autoremove(operation: &'static str, source: speedgov_autoremove::AutoRemoveError) -> Self {
        Self::AutoRemove { operation, source }
    }
}
