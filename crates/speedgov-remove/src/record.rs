//! A fixed-capacity history of torrents removed by the auto-remove loop.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default and maximum size of a [`RemoveRecordRing`].
pub const MAX_RECORDS: usize = 500;

/// One completed removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveRecord {
    /// When the removal happened.
    pub timestamp: DateTime<Utc>,
    /// Owning client instance id.
    pub instance_id: i64,
    /// Owning client instance name.
    pub instance_name: String,
    /// Removed torrent's hash.
    pub torrent_hash: String,
    /// Removed torrent's name.
    pub torrent_name: String,
    /// Name of the rule that matched.
    pub rule_name: String,
    /// The matched rule's description, used as the removal reason.
    pub reason: String,
    /// Torrent size, bytes.
    pub size: i64,
    /// Bytes uploaded at the time of removal.
    pub uploaded: i64,
    /// Upload/download ratio at the time of removal.
    pub ratio: f64,
}

/// A ring buffer of [`RemoveRecord`]s capped at [`MAX_RECORDS`].
#[derive(Debug, Clone, Default)]
pub struct RemoveRecordRing {
    records: VecDeque<RemoveRecord>,
}

impl RemoveRecordRing {
    /// Construct an empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
        }
    }

    /// Append a record, evicting the oldest entry if the ring is full.
    pub fn push(&mut self, record: RemoveRecord) {
        if self.records.len() >= MAX_RECORDS {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Current number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ring holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent `limit` records, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<RemoveRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: i64) -> RemoveRecord {
        RemoveRecord {
            timestamp: Utc::now(),
            instance_id: 1,
            instance_name: "inst".into(),
            torrent_hash: format!("hash{n}"),
            torrent_name: format!("torrent{n}"),
            rule_name: "rule".into(),
            reason: "stale".into(),
            size: 0,
            uploaded: 0,
            ratio: 0.0,
        }
    }

    #[test]
    fn caps_at_max_records() {
        let mut ring = RemoveRecordRing::new();
        for n in 0..(MAX_RECORDS as i64 + 10) {
            ring.push(record(n));
        }
        assert_eq!(ring.len(), MAX_RECORDS);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut ring = RemoveRecordRing::new();
        for n in 0..(MAX_RECORDS as i64 + 1) {
            ring.push(record(n));
        }
        let oldest_surviving = ring.recent(MAX_RECORDS).last().cloned().unwrap();
        assert_eq!(oldest_surviving.torrent_hash, "hash1");
    }

    #[test]
    fn recent_returns_newest_first() {
        let mut ring = RemoveRecordRing::new();
        ring.push(record(1));
        ring.push(record(2));
        let recent = ring.recent(1);
        assert_eq!(recent[0].torrent_hash, "hash2");
    }
}
