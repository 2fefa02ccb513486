//! One governor tick: enumerate clients, classify seeding torrents against
//! a site rule, and advance each matched torrent's control state.

use std::sync::atomic::{AtomicU64, Ordering};

use speedgov_core::{PtSite, SiteRule, TorrentLimitState, compute_limit, find_rule};
use speedgov_ports::{ClientDriver, Notifier, QbInstance, SiteScraper, TorrentInfo};
use speedgov_telemetry::Metrics;
use tracing::{info, warn};

use crate::oracle_probe::probe;
use crate::state_table::StateTable;

/// Seconds between status log lines for the same torrent (spec §4.5).
const STATUS_LOG_INTERVAL: f64 = 20.0;

/// Per-source reannounce-resolution counters backing `get_stats`.
#[derive(Default)]
pub struct OracleCounters {
    site_success: AtomicU64,
    qb_api_success: AtomicU64,
    fallback_count: AtomicU64,
}

impl OracleCounters {
    fn record(&self, source: speedgov_core::ReannounceSource, metrics: &Metrics) {
        use speedgov_core::ReannounceSource::{Cached, Estimated, QbApi, Site};
        let tag = match source {
            Site => {
                self.site_success.fetch_add(1, Ordering::Relaxed);
                "site"
            }
            QbApi => {
                self.qb_api_success.fetch_add(1, Ordering::Relaxed);
                "qb_api"
            }
            Estimated => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                "estimated"
            }
            Cached => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                "cached"
            }
        };
        metrics.inc_reannounce_source(tag);
    }

    /// Current counter values, `(site, qb_api, fallback)`.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.site_success.load(Ordering::Relaxed),
            self.qb_api_success.load(Ordering::Relaxed),
            self.fallback_count.load(Ordering::Relaxed),
        )
    }
}

/// A torrent is seeding if it is actively uploading, or its client-reported
/// state string says so (spec §4.4 step 3b).
fn is_seeding(torrent: &TorrentInfo) -> bool {
    if torrent.upload_speed > 0.0 {
        return true;
    }
    let state = torrent.state.to_ascii_lowercase();
    state.contains("upload") || state.contains("seed") || state.ends_with("up")
}

/// Run one tick against every enabled client instance: enumerate torrents,
/// classify seeding ones against a matching rule, and advance their control
/// state. Never propagates a per-instance or per-torrent failure; those are
/// logged and the tick continues with the next entity.
#[allow(clippy::too_many_arguments)]
pub async fn run_tick(
    states: &StateTable,
    client: &dyn ClientDriver,
    scraper: &dyn SiteScraper,
    notifier: &dyn Notifier,
    metrics: &Metrics,
    counters: &OracleCounters,
    instances: &[QbInstance],
    sites: &[PtSite],
    rules: &[SiteRule],
    now: f64,
) {
    let mut seen = std::collections::HashSet::new();

    for instance in instances.iter().filter(|instance| instance.enabled) {
        if !client.is_connected(instance.id).await {
            continue;
        }

        let torrents = match client.get_torrents(instance.id).await {
            Ok(torrents) => torrents,
            Err(err) => {
                warn!(instance = instance.id, error = %err, "failed to enumerate torrents");
                continue;
            }
        };

        for torrent in torrents.iter().filter(|torrent| is_seeding(torrent)) {
            let Some(rule) = find_rule(&torrent.tracker, sites, rules) else {
                continue;
            };
            if !rule.enabled {
                continue;
            }

            seen.insert(torrent.hash.clone());
            process_torrent(
                states, client, scraper, notifier, metrics, counters, instance, torrent, rule, now,
            )
            .await;
        }
    }

    metrics.set_torrents_controlled(states.len() as i64);
    states.retain_hashes(&seen);
}

#[allow(clippy::too_many_arguments)]
async fn process_torrent(
    states: &StateTable,
    client: &dyn ClientDriver,
    scraper: &dyn SiteScraper,
    notifier: &dyn Notifier,
    metrics: &Metrics,
    counters: &OracleCounters,
    instance: &QbInstance,
    torrent: &TorrentInfo,
    rule: &SiteRule,
    now: f64,
) {
    let target_speed = rule.target_speed_bytes();
    let hash = torrent.hash.clone();
    let name = torrent.name.clone();
    let tracker = torrent.tracker.clone();
    let instance_id = instance.id;
    let uploaded = torrent.uploaded;

    let mut working_state = states.with_entry_or_insert(
        &hash,
        || TorrentLimitState::new(&hash, &name, &tracker, instance_id, now, uploaded, target_speed),
        Clone::clone,
    );
    working_state.target_speed = target_speed;

    let (time_left, source) = probe(&mut working_state, torrent, scraper, now).await;
    counters.record(source, metrics);

    let decision = compute_limit(&mut working_state, uploaded, torrent.upload_speed, now, time_left, source);

    if decision.limit != working_state.last_limit {
        match client.set_upload_limit(instance_id, &hash, decision.limit).await {
            Ok(()) => {
                working_state.last_limit = decision.limit;
                working_state.last_limit_reason.clone_from(&decision.reason);
                notifier.notify(
                    "upload limit applied",
                    &format!("{name}: {} ({})", decision.limit, decision.reason),
                );
            }
            Err(err) => {
                metrics.inc_control_cycle_error();
                warn!(instance = instance_id, hash = %hash, error = %err, "failed to apply upload limit");
            }
        }
    }

    if now - working_state.last_log_time >= STATUS_LOG_INTERVAL {
        working_state.last_log_time = now;
        info!(
            hash = %hash,
            name = %name,
            phase = ?decision.phase,
            speed = torrent.upload_speed,
            progress_pct = decision.progress * 100.0,
            time_left,
            limit = decision.limit,
            reason = %decision.reason,
            "torrent control status",
        );
    }

    states.with_entry_or_insert(&hash, || working_state.clone(), |slot| *slot = working_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(hash: &str, upload_speed: f64, state: &str) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: hash.to_string(),
            state: state.to_string(),
            tracker: "https://tracker.example/announce".to_string(),
            size: 1_000_000,
            uploaded: 0,
            upload_speed,
            progress: 0.5,
            ratio: 1.0,
            seeding_time: 0.0,
            last_activity: 0.0,
            reannounce_time: None,
        }
    }

    #[test]
    fn seeding_detected_by_speed() {
        assert!(is_seeding(&torrent("a", 1024.0, "unknown")));
    }

    #[test]
    fn seeding_detected_by_state_keyword() {
        assert!(is_seeding(&torrent("a", 0.0, "stalledUP")));
        assert!(is_seeding(&torrent("a", 0.0, "uploading")));
    }

    #[test]
    fn seeding_detected_by_state_suffix() {
        assert!(is_seeding(&torrent("a", 0.0, "forcedUP")));
    }

    #[test]
    fn not_seeding_when_idle_and_unmatched() {
        assert!(!is_seeding(&torrent("a", 0.0, "pausedDL")));
    }

    #[test]
    fn counters_tag_sources_correctly() {
        let counters = OracleCounters::default();
        let metrics = Metrics::new().expect("metrics construct");
        counters.record(speedgov_core::ReannounceSource::Site, &metrics);
        counters.record(speedgov_core::ReannounceSource::QbApi, &metrics);
        counters.record(speedgov_core::ReannounceSource::Cached, &metrics);
        let (site, qb, fallback) = counters.snapshot();
        assert_eq!(site, 1);
        assert_eq!(qb, 1);
        assert_eq!(fallback, 1);
    }
}
