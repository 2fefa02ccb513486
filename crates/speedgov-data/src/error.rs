//! Error type for the Postgres-backed store.

use thiserror::Error;

/// Failures raised while talking to the backing Postgres database.
#[derive(Debug, Error)]
pub enum DataError {
    /// Running the embedded migrations failed.
    #[error("failed to run store migrations")]
    Migration(#[source] sqlx::migrate::MigrateError),
    /// A query or statement failed.
    #[error("store query failed: {operation}")]
    Query {
        /// Operation identifier, for logs.
        operation: &'static str,
        /// Underlying SQL error.
        #[source]
        source: sqlx::Error,
    },
}

/// Result alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, DataError>;
