//! A named, orderable remove rule and first-match evaluation over a list of
//! them.

use serde::{Deserialize, Serialize};

use crate::condition::{RemoveCondition, TorrentSnapshot};

/// One configured auto-remove rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveRule {
    /// Unique rule name.
    pub name: String,
    /// Human-readable description, surfaced as the removal reason.
    pub description: String,
    /// Whether this rule is currently active.
    pub enabled: bool,
    /// The AND-of-optional-predicates condition.
    pub condition: RemoveCondition,
}

/// Evaluate `rules` in order against `torrent`, returning the first enabled
/// rule whose condition matches.
#[must_use]
pub fn match_rules<'a>(
    torrent: &TorrentSnapshot,
    free_space: i64,
    now: f64,
    rules: &'a [RemoveRule],
) -> Option<&'a RemoveRule> {
    rules
        .iter()
        .find(|rule| rule.enabled && rule.condition.matches(torrent, free_space, now))
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
    fn first_matching_rule_wins() {
        let never = RemoveRule {
            name: "never".into(),
            description: "".into(),
            enabled: true,
            condition: RemoveCondition {
                ratio_gt: Some(1000.0),
                ..Default::default()
            },
        };
        let always = RemoveRule {
            name: "always".into(),
            description: "ratio above 2".into(),
            enabled: true,
            condition: RemoveCondition {
                ratio_gt: Some(2.0),
                ..Default::default()
            },
        };
        let rules = vec![never, always.clone()];
        let matched = match_rules(&torrent(), 0, 0.0, &rules);
        assert_eq!(matched, Some(&always));
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let rule = RemoveRule {
            name: "disabled".into(),
            description: "".into(),
            enabled: false,
            condition: RemoveCondition::default(),
        };
        let rules = vec![rule];
        assert_eq!(match_rules(&torrent(), 0, 0.0, &rules), None);
    }

    #[test]
    fn no_rules_match_is_none() {
        let rule = RemoveRule {
            name: "picky".into(),
            description: "".into(),
            enabled: true,
            condition: RemoveCondition {
                ratio_gt: Some(1000.0),
                ..Default::default()
            },
        };
        let rules = vec![rule];
        assert_eq!(match_rules(&torrent(), 0, 0.0, &rules), None);
    }
}
