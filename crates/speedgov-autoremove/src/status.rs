//! Inspection DTOs exposed by the auto-remove engine.

use serde::Serialize;

/// Aggregate auto-remove status and running totals (spec §4.6 supplement,
/// mirroring `original_source/backend/auto_remove_engine.py`'s
/// `total_removed`/`total_freed` counters).
#[derive(Debug, Clone, Serialize)]
pub struct AutoRemoveStatus {
    /// Whether the tick loop is currently running.
    pub running: bool,
    /// Whether rule evaluation is currently enabled via configuration.
    pub enabled: bool,
    /// Torrents removed since the engine started.
    pub total_removed: u64,
    /// Bytes of disk space freed since the engine started.
    pub total_freed: u64,
}

/// Outcome of a manual or scheduled auto-remove pass (spec §4.6's
/// `(success, message)` manual-trigger contract).
#[derive(Debug, Clone, Serialize)]
pub struct ManualCheckOutcome {
    /// Whether the pass completed without a fatal error.
    pub success: bool,
    /// Human-readable summary, e.g. how many torrents were removed.
    pub message: String,
}
