//! The persistence port: configuration, rule and site tables, per-torrent
//! control state, and an operational log.

use async_trait::async_trait;
use thiserror::Error;

use speedgov_core::{PtSite, SiteRule, TorrentLimitState};
use speedgov_remove::RemoveRule;

use crate::client::QbInstance;

/// Failure modes surfaced by a [`Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database connection failed or timed out.
    #[error("store backend error: {source}")]
    Backend {
        /// Underlying database error.
        #[source]
        source: anyhow::Error,
    },
    /// A stored row could not be decoded into its domain type.
    #[error("store row for {table} failed to decode: {message}")]
    Decode {
        /// The table the malformed row came from.
        table: &'static str,
        /// Decoding failure description.
        message: String,
    },
}

/// Severity of an operational log line persisted via [`Store::add_log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Fine-grained diagnostic detail.
    Debug,
    /// Routine operational events.
    Info,
    /// Recoverable anomalies worth operator attention.
    Warning,
    /// Failures that interrupted a control cycle or removal.
    Error,
}

/// Durable configuration, rule, site, and control-state storage, backing
/// both the governor and auto-remove loops.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a string configuration value, falling back to `default` if unset.
    async fn get_config(&self, key: &str, default: &str) -> Result<String, StoreError>;

    /// Persist a string configuration value.
    async fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Append an operational log line.
    async fn add_log(&self, level: LogLevel, message: &str) -> Result<(), StoreError>;

    /// All configured upload-rate rules, enabled and disabled alike.
    async fn get_speed_rules(&self) -> Result<Vec<SiteRule>, StoreError>;

    /// All configured private tracker sites.
    async fn get_pt_sites(&self) -> Result<Vec<PtSite>, StoreError>;

    /// All configured BitTorrent client instances.
    async fn get_qb_instances(&self) -> Result<Vec<QbInstance>, StoreError>;

    /// Currently enabled auto-remove rules, in evaluation order.
    async fn get_enabled_remove_rules(&self) -> Result<Vec<RemoveRule>, StoreError>;

    /// All persisted per-torrent control states.
    async fn get_all_torrent_limit_states(&self) -> Result<Vec<TorrentLimitState>, StoreError>;

    /// Upsert one torrent's control state.
    async fn save_torrent_limit_state(&self, state: &TorrentLimitState) -> Result<(), StoreError>;

    /// Drop a torrent's control state, e.g. after it is removed or stops
    /// seeding.
    async fn delete_torrent_limit_state(&self, hash: &str) -> Result<(), StoreError>;
}
