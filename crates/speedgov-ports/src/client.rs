//! The BitTorrent client driver port: everything the governor and
//! auto-remove loops need from a qBittorrent-compatible instance.

use async_trait::async_trait;
use thiserror::Error;

/// Failure modes surfaced by a [`ClientDriver`] implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The instance could not be reached or authenticated against.
    #[error("client instance {instance_id} unreachable: {source}")]
    Unreachable {
        /// The instance that failed.
        instance_id: i64,
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },
    /// The client instance rejected the request as malformed or unsupported.
    #[error("client instance {instance_id} rejected {operation}: {message}")]
    Rejected {
        /// The instance that rejected the request.
        instance_id: i64,
        /// The operation attempted, for logs.
        operation: &'static str,
        /// The client's own error message.
        message: String,
    },
}

/// A snapshot of one torrent as reported by a client instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentInfo {
    /// Opaque torrent hash.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Client-reported lifecycle state string (e.g. `"uploading"`, `"stalledUP"`).
    pub state: String,
    /// Tracker announce URL.
    pub tracker: String,
    /// Total torrent size, bytes.
    pub size: i64,
    /// Total bytes uploaded since the client last reset its counters.
    pub uploaded: i64,
    /// Current upload speed, bytes/s.
    pub upload_speed: f64,
    /// Download/seed completion, `0.0..=1.0`.
    pub progress: f64,
    /// Upload/download ratio.
    pub ratio: f64,
    /// Total seeding time, seconds.
    pub seeding_time: f64,
    /// Wall-clock of last peer activity, or `0.0` if unknown/never.
    pub last_activity: f64,
    /// Client-reported seconds until the next tracker reannounce, when known.
    pub reannounce_time: Option<f64>,
}

/// A configured BitTorrent client instance.
#[derive(Debug, Clone, PartialEq)]
pub struct QbInstance {
    /// Store-assigned instance id.
    pub id: i64,
    /// Human-readable name, for logs and notifications.
    pub name: String,
    /// Whether this instance is currently polled.
    pub enabled: bool,
}

/// Outcome of a delete request: the client's own success/failure judgment,
/// independent of transport-level failures (which surface as
/// [`ClientError::Unreachable`] instead).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the client reports the torrent as removed.
    pub success: bool,
    /// The client's own status message.
    pub message: String,
}

/// Everything the governor and auto-remove loops need from a BitTorrent
/// client instance. One implementation talks to a live qBittorrent Web API;
/// [`testing::FakeClientDriver`](crate::testing::FakeClientDriver) is an
/// in-memory fake for unit tests.
#[async_trait]
pub trait ClientDriver: Send + Sync {
    /// Whether `instance_id` is currently reachable and authenticated.
    async fn is_connected(&self, instance_id: i64) -> bool;

    /// List all torrents currently known to `instance_id`.
    async fn get_torrents(&self, instance_id: i64) -> Result<Vec<TorrentInfo>, ClientError>;

    /// Free disk space remaining on `instance_id`'s download volume, bytes.
    async fn get_free_space(&self, instance_id: i64) -> Result<i64, ClientError>;

    /// Push a new upload rate limit for `hash` on `instance_id`.
    /// `speedgov_core::UNCAPPED` requests the client's unlimited setting.
    async fn set_upload_limit(
        &self,
        instance_id: i64,
        hash: &str,
        bytes_per_sec: i64,
    ) -> Result<(), ClientError>;

    /// Force an immediate tracker reannounce for `hash`.
    async fn reannounce(&self, instance_id: i64, hash: &str) -> Result<(), ClientError>;

    /// Remove `hash` from `instance_id`, optionally deleting downloaded data.
    async fn delete_torrent(
        &self,
        instance_id: i64,
        hash: &str,
        delete_files: bool,
    ) -> Result<DeleteOutcome, ClientError>;
}
