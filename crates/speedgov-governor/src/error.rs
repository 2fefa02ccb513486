//! Error type for the governor engine's lifecycle operations.

use thiserror::Error;

/// Errors raised by the governor engine's public control surface.
///
/// Per-tick, per-torrent failures never reach this type — they are logged
/// and swallowed at the loop boundary, per the spec's error taxonomy.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// The engine was already running when `start` was called.
    #[error("governor engine is already running")]
    AlreadyRunning,
    /// Shutdown did not complete within the join timeout and was forced.
    #[error("governor engine shutdown timed out after {seconds}s")]
    ShutdownTimedOut {
        /// The timeout that was exceeded.
        seconds: u64,
    },
}

/// Result alias for governor engine operations.
pub type GovernorResult<T> = Result<T, GovernorError>;
