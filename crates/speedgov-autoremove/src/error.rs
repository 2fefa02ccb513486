//! Error type for the auto-remove engine's lifecycle operations.

use thiserror::Error;

/// Errors raised by the auto-remove engine's public control surface.
///
/// Per-tick, per-torrent failures never reach this type — they are logged
/// and swallowed at the loop boundary, per the spec's error taxonomy.
#[derive(Debug, Error)]
pub enum AutoRemoveError {
    /// The engine was already running when `start` was called.
    #[error("auto-remove engine is already running")]
    AlreadyRunning,
    /// Shutdown did not complete within the join timeout and was forced.
    #[error("auto-remove engine shutdown timed out after {seconds}s")]
    ShutdownTimedOut {
        /// The timeout that was exceeded.
        seconds: u64,
    },
}

/// Result alias for auto-remove engine operations.
pub type AutoRemoveResult<T> = Result<T, AutoRemoveError>;
