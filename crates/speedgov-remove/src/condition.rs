//! The AND-of-optional-predicates condition model for a remove rule.

use serde::{Deserialize, Serialize};

/// The subset of a torrent's reported fields a condition can match against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorrentSnapshot {
    /// Current upload speed, bytes/s.
    pub upload_speed: f64,
    /// Download/seed completion, `0.0..=1.0`.
    pub progress: f64,
    /// Total seconding time, seconds.
    pub seeding_time: f64,
    /// Upload/download ratio.
    pub ratio: f64,
    /// Total torrent size, bytes.
    pub size: i64,
    /// Wall-clock of last peer activity, or `0.0` if unknown/never.
    pub last_activity: f64,
}

/// A tagged, open set of optional predicates, AND-combined: every key
/// present in a stored rule must hold for the rule to match; absent keys
/// are "don't care". Unknown keys in a stored rule are ignored by the
/// deserializer (`serde`'s default behavior for unrecognized map keys when
/// loading from the JSON `condition` column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoveCondition {
    /// Matches when the client instance's free space is below this many
    /// bytes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub free_space_lt: Option<i64>,
    /// Matches when the torrent's upload speed is below this many bytes/s.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub upload_speed_lt: Option<f64>,
    /// Matches when set to `true` and the torrent's progress is `>= 1.0`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed: Option<bool>,
    /// Matches when the torrent has been seeding for longer than this many
    /// seconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seeding_time_gt: Option<f64>,
    /// Matches when the torrent's ratio exceeds this value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ratio_gt: Option<f64>,
    /// Matches when the torrent's size exceeds this many bytes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size_gt: Option<i64>,
    /// Matches when the torrent has had no peer activity for longer than
    /// this many seconds (only evaluated when `last_activity > 0`).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub no_peers_time_gt: Option<f64>,
}

impl RemoveCondition {
    /// Evaluate this condition against a torrent snapshot, the client
    /// instance's free space, and the current wall-clock time. All present
    /// predicates must hold (AND semantics); an empty condition matches
    /// everything.
    #[must_use]
    pub fn matches(&self, torrent: &TorrentSnapshot, free_space: i64, now: f64) -> bool {
        if let Some(threshold) = self.free_space_lt {
            if free_space >= threshold {
                return false;
            }
        }
        if let Some(threshold) = self.upload_speed_lt {
            if torrent.upload_speed >= threshold {
                return false;
            }
        }
        if self.completed == Some(true) && torrent.progress < 1.0 {
            return false;
        }
        if let Some(threshold) = self.seeding_time_gt {
            if torrent.seeding_time <= threshold {
                return false;
            }
        }
        if let Some(threshold) = self.ratio_gt {
            if torrent.ratio <= threshold {
                return false;
            }
        }
        if let Some(threshold) = self.size_gt {
            if torrent.size as f64 <= threshold as f64 {
                return false;
            }
        }
        if let Some(threshold) = self.no_peers_time_gt {
            if torrent.last_activity > 0.0 && now - torrent.last_activity <= threshold {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent() -> TorrentSnapshot {
        TorrentSnapshot {
            upload_speed: 0.0,
            progress: 1.0,
            seeding_time: 0.0,
            ratio: 2.01,
            size: 2_000_000_000,
            last_activity: 0.0,
        }
    }

    #[test]
    fn empty_condition_matches_everything() {
        let condition = RemoveCondition::default();
        assert!(condition.matches(&torrent(), 0, 0.0));
    }

    #[test]
    fn and_semantics_across_present_predicates() {
        let condition = RemoveCondition {
            ratio_gt: Some(2.0),
            completed: Some(true),
            size_gt: Some(1_000_000_000),
            ..Default::default()
        };
        assert!(condition.matches(&torrent(), 0, 0.0));

        let mut not_done = torrent();
        not_done.progress = 0.99;
        assert!(!condition.matches(&not_done, 0, 0.0));
    }

    #[test]
    fn free_space_predicate() {
        let condition = RemoveCondition {
            free_space_lt: Some(1000),
            ..Default::default()
        };
        assert!(condition.matches(&torrent(), 500, 0.0));
        assert!(!condition.matches(&torrent(), 5000, 0.0));
    }

    #[test]
    fn no_peers_time_requires_known_last_activity() {
        let condition = RemoveCondition {
            no_peers_time_gt: Some(60.0),
            ..Default::default()
        };
        let mut idle = torrent();
        idle.last_activity = 0.0;
        assert!(condition.matches(&idle, 0, 1000.0));

        idle.last_activity = 900.0;
        assert!(!condition.matches(&idle, 0, 910.0));
        assert!(condition.matches(&idle, 0, 1000.0));
    }

    #[test]
    fn unknown_keys_are_ignored_by_deserializer() {
        let json = serde_json::json!({
            "ratio_gt": 2.0,
            "some_future_predicate": "value"
        });
        let condition: RemoveCondition = serde_json::from_value(json).expect("parses");
        assert_eq!(condition.ratio_gt, Some(2.0));
        assert_eq!(condition.free_space_lt, None);
    }
}
