//! Probes the two I/O-backed reannounce sources (site scraper, client RPC)
//! and hands the candidates to [`speedgov_core::oracle::reconcile_reannounce`]
//! for the fixed-precedence decision.

use speedgov_core::ReannounceSource;
use speedgov_core::TorrentLimitState;
use speedgov_core::oracle::reconcile_reannounce;
use speedgov_ports::{ScraperError, SiteScraper, TorrentInfo};
use tracing::debug;

/// Resolve `(seconds_to_next_announce, source)` for one torrent, probing
/// the site scraper and the already-fetched client torrent snapshot in the
/// spec's fixed precedence order, then falling back to estimation from a
/// previously recorded `reannounce_time` and finally the cached value.
///
/// Only the client-RPC path updates `state.reannounce_time`, and only when
/// it actually wins precedence over the site scraper; the site-scraper path
/// updates `state.tid` (once resolved) but never writes `reannounce_time`.
pub async fn probe(
    state: &mut TorrentLimitState,
    torrent: &TorrentInfo,
    scraper: &dyn SiteScraper,
    now: f64,
) -> (f64, ReannounceSource) {
    let site_value = site_candidate(state, torrent, scraper).await;
    let qb_value = torrent.reannounce_time;
    let site_wins = site_value.is_some_and(|value| value > 0.0);

    if !site_wins {
        if let Some(value) = qb_value {
            if value > 0.0 && value < 86_400.0 {
                state.reannounce_time = now + value;
            }
        }
    }

    reconcile_reannounce(site_value, qb_value, state.reannounce_time, now, state.cached_time_left)
}

async fn site_candidate(
    state: &mut TorrentLimitState,
    torrent: &TorrentInfo,
    scraper: &dyn SiteScraper,
) -> Option<f64> {
    let helper = scraper.get_helper_by_tracker(&torrent.tracker)?;
    if !helper.enabled() {
        return None;
    }

    if state.tid.is_none() {
        match helper.search_tid_by_hash(&state.hash).await {
            Ok(Some(tid)) => state.tid = Some(tid),
            Ok(None) => return None,
            Err(err) => {
                log_scraper_error(&err, "search_tid_by_hash");
                return None;
            }
        }
    }

    let tid = state.tid?;
    match helper.get_reannounce_time(tid).await {
        Ok(value) => value.filter(|value| *value > 0.0),
        Err(err) => {
            log_scraper_error(&err, "get_reannounce_time");
            None
        }
    }
}

fn log_scraper_error(err: &ScraperError, operation: &'static str) {
    debug!(error = %err, operation, "site scraper probe failed, falling back");
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedgov_ports::testing::{FakeSiteHelper, FakeSiteScraper};
    use std::sync::Arc;

    fn torrent(tracker: &str, reannounce: Option<f64>) -> TorrentInfo {
        TorrentInfo {
            hash: "abc".to_string(),
            name: "demo".to_string(),
            state: "uploading".to_string(),
            tracker: tracker.to_string(),
            size: 1_000_000,
            uploaded: 0,
            upload_speed: 0.0,
            progress: 1.0,
            ratio: 1.0,
            seeding_time: 0.0,
            last_activity: 0.0,
            reannounce_time: reannounce,
        }
    }

    #[tokio::test]
    async fn site_wins_and_leaves_reannounce_time_untouched() {
        let mut state = TorrentLimitState::new("abc", "demo", "t", 1, 0.0, 0, 1024);
        state.reannounce_time = 0.0;
        let scraper = FakeSiteScraper::new();
        let helper: Arc<dyn speedgov_ports::SiteHelper> = Arc::new(
            FakeSiteHelper::new().with_tid("abc", 42).with_reannounce_time(42, 500.0),
        );
        scraper.register("examplept", helper).await;

        let (value, source) = probe(
            &mut state,
            &torrent("https://tracker.examplept.net/announce", Some(1200.0)),
            &scraper,
            1000.0,
        )
        .await;

        assert_eq!(value, 500.0);
        assert_eq!(source, ReannounceSource::Site);
        assert_eq!(state.reannounce_time, 0.0);
    }

    #[tokio::test]
    async fn qb_api_updates_reannounce_time_when_no_site_match() {
        let mut state = TorrentLimitState::new("abc", "demo", "t", 1, 0.0, 0, 1024);
        let scraper = FakeSiteScraper::new();

        let (value, source) = probe(
            &mut state,
            &torrent("https://unrelated.example/announce", Some(900.0)),
            &scraper,
            1000.0,
        )
        .await;

        assert_eq!(value, 900.0);
        assert_eq!(source, ReannounceSource::QbApi);
        assert_eq!(state.reannounce_time, 1900.0);
    }

    #[tokio::test]
    async fn falls_back_to_cache_when_nothing_else_available() {
        let mut state = TorrentLimitState::new("abc", "demo", "t", 1, 0.0, 0, 1024);
        state.cached_time_left = 42.0;
        let scraper = FakeSiteScraper::new();

        let (value, source) = probe(
            &mut state,
            &torrent("https://unrelated.example/announce", None),
            &scraper,
            1000.0,
        )
        .await;

        assert_eq!(value, 42.0);
        assert_eq!(source, ReannounceSource::Cached);
    }
}
