//! Per-site speed rules and the tracker-to-rule matching they drive.

use serde::{Deserialize, Serialize};

/// A configured upload-rate target for one PT site, or the default
/// (`site_id = None`) fallback rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRule {
    /// Site this rule applies to; `None` means the default fallback rule.
    pub site_id: Option<i64>,
    /// Target upload rate, kibibytes per second.
    pub target_speed_kib: i64,
    /// Multiplicative safety margin in `(0, 1]`, applied to the target.
    pub safety_margin: f64,
    /// Whether this rule is currently active.
    pub enabled: bool,
}

impl SiteRule {
    /// Default safety margin used when a stored rule omits the field.
    pub const DEFAULT_SAFETY_MARGIN: f64 = 0.98;

    /// Resolve this rule's target upload rate in bytes/s, applying the
    /// safety margin.
    #[must_use]
    pub fn target_speed_bytes(&self) -> i64 {
        (self.target_speed_kib as f64 * 1024.0 * self.safety_margin) as i64
    }
}

/// A private tracker site, identified by id, with the keyword/URL used to
/// recognize its torrents by tracker announce URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtSite {
    /// Site identifier, matched against [`SiteRule::site_id`].
    pub id: i64,
    /// Human-readable site name.
    pub name: String,
    /// Canonical site URL.
    pub url: String,
    /// Substring probed (case-insensitively) against a torrent's tracker
    /// announce URL.
    pub tracker_keyword: String,
}

/// Find the rule matching `tracker`, by iterating `sites` in order: a site
/// matches if its keyword is a case-insensitive substring of `tracker`, or
/// its URL's host is. First match wins. Falls back to the default
/// (`site_id = None`) rule when present, otherwise `None`.
#[must_use]
pub fn find_rule<'a>(
    tracker: &str,
    sites: &[PtSite],
    rules: &'a [SiteRule],
) -> Option<&'a SiteRule> {
    let tracker_lower = tracker.to_ascii_lowercase();

    for site in sites {
        let Some(rule) = rules
            .iter()
            .find(|rule| rule.enabled && rule.site_id == Some(site.id))
        else {
            continue;
        };

        if !site.tracker_keyword.is_empty()
            && tracker_lower.contains(&site.tracker_keyword.to_ascii_lowercase())
        {
            return Some(rule);
        }

        if let Some(host) = site_host(&site.url) {
            if !host.is_empty() && tracker_lower.contains(&host) {
                return Some(rule);
            }
        }
    }

    rules.iter().find(|rule| rule.enabled && rule.site_id.is_none())
}

/// Extract and lowercase the host component of a URL without pulling in a
/// full URL-parsing dependency; good enough for the substring probe above.
fn site_host(url: &str) -> Option<String> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(site_id: Option<i64>) -> SiteRule {
        SiteRule {
            site_id,
            target_speed_kib: 1024,
            safety_margin: 0.98,
            enabled: true,
        }
    }

    #[test]
    fn matches_by_keyword() {
        let sites = vec![PtSite {
            id: 1,
            name: "Example".into(),
            url: "https://example-pt.example".into(),
            tracker_keyword: "examplept".into(),
        }];
        let rules = vec![rule(Some(1))];
        let found = find_rule("https://tracker.examplept.net/announce", &sites, &rules);
        assert_eq!(found, Some(&rules[0]));
    }

    #[test]
    fn matches_by_host() {
        let sites = vec![PtSite {
            id: 2,
            name: "Example".into(),
            url: "https://ptsite.example".into(),
            tracker_keyword: String::new(),
        }];
        let rules = vec![rule(Some(2))];
        let found = find_rule("https://ptsite.example/announce?x=1", &sites, &rules);
        assert_eq!(found, Some(&rules[0]));
    }

    #[test]
    fn falls_back_to_default_rule() {
        let sites = vec![PtSite {
            id: 3,
            name: "Other".into(),
            url: "https://other.example".into(),
            tracker_keyword: "other".into(),
        }];
        let rules = vec![rule(Some(3)), rule(None)];
        let found = find_rule("https://unrelated.example/announce", &sites, &rules);
        assert_eq!(found, Some(&rules[1]));
    }

    #[test]
    fn no_match_and_no_default_is_none() {
        let rules = vec![rule(Some(4))];
        let found = find_rule("https://unrelated.example/announce", &[], &rules);
        assert_eq!(found, None);
    }

    #[test]
    fn target_speed_applies_safety_margin() {
        let r = SiteRule {
            site_id: None,
            target_speed_kib: 1000,
            safety_margin: 0.5,
            enabled: true,
        };
        assert_eq!(r.target_speed_bytes(), (1000.0 * 1024.0 * 0.5) as i64);
    }
}
