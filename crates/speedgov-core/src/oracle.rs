//! Pure reconciliation of "seconds to next announce" across the three
//! reannounce sources. Probing the sources themselves requires I/O and lives
//! in the governor crate; this module only encodes the fixed precedence
//! order once the three candidate values are known.

use serde::{Deserialize, Serialize};

/// Which source ultimately produced the chosen time-left value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReannounceSource {
    /// Resolved from a PT site's own scraped status page.
    Site,
    /// Resolved from the BitTorrent client's `reannounce` RPC property.
    QbApi,
    /// Estimated from a previously recorded `reannounce_time`.
    Estimated,
    /// Fell back to the last known cached value.
    Cached,
}

/// Apply the fixed source-precedence order: site, then client RPC, then
/// estimation from a previously recorded `reannounce_time`, then the cached
/// fallback. Returns the first candidate that succeeds along with its tag.
///
/// - `site`: `Some(seconds)` when the site scraper returned a value `> 0`.
/// - `qb_api`: `Some(seconds)` when the client RPC returned a value
///   strictly within `(0, 86_400)`.
/// - `reannounce_time`: the absolute wall-clock of the next announce, used
///   for estimation when positive (`reannounce_time - now`).
/// - `now`: current wall-clock seconds, used to turn `reannounce_time` into
///   a relative estimate.
/// - `cached`: the last known time-left value, used only if all of the
///   above are unavailable.
#[must_use]
pub fn reconcile_reannounce(
    site: Option<f64>,
    qb_api: Option<f64>,
    reannounce_time: f64,
    now: f64,
    cached: f64,
) -> (f64, ReannounceSource) {
    if let Some(value) = site.filter(|value| *value > 0.0) {
        return (value, ReannounceSource::Site);
    }
    if let Some(value) = qb_api.filter(|value| *value > 0.0 && *value < 86_400.0) {
        return (value, ReannounceSource::QbApi);
    }
    if reannounce_time > 0.0 {
        return ((reannounce_time - now).max(0.0), ReannounceSource::Estimated);
    }
    (cached, ReannounceSource::Cached)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_wins_when_positive() {
        let (value, source) = reconcile_reannounce(Some(500.0), Some(1200.0), 900.0, 0.0, 60.0);
        assert_eq!(value, 500.0);
        assert_eq!(source, ReannounceSource::Site);
    }

    #[test]
    fn qb_api_used_when_site_absent() {
        let (value, source) = reconcile_reannounce(None, Some(1200.0), 0.0, 0.0, 60.0);
        assert_eq!(value, 1200.0);
        assert_eq!(source, ReannounceSource::QbApi);
    }

    #[test]
    fn qb_api_out_of_range_is_rejected() {
        let (value, source) = reconcile_reannounce(None, Some(90_000.0), 500.0, 0.0, 60.0);
        assert_eq!(value, 500.0);
        assert_eq!(source, ReannounceSource::Estimated);
    }

    #[test]
    fn estimation_used_when_site_and_qb_absent() {
        let (value, source) = reconcile_reannounce(None, None, 100.0, 40.0, 60.0);
        assert_eq!(value, 60.0);
        assert_eq!(source, ReannounceSource::Estimated);
    }

    #[test]
    fn cached_is_last_resort() {
        let (value, source) = reconcile_reannounce(None, None, 0.0, 40.0, 60.0);
        assert_eq!(value, 60.0);
        assert_eq!(source, ReannounceSource::Cached);
    }
}
