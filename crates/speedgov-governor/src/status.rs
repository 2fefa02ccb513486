//! Inspection DTOs exposed by the governor engine: aggregate status and
//! rich per-torrent snapshots.

use serde::Serialize;
use speedgov_core::{KalmanFilter, Phase, ReannounceSource, TorrentLimitState};

/// Aggregate governor status and observability counters (spec §6 `get_stats`).
#[derive(Debug, Clone, Serialize)]
pub struct GovernorStatus {
    /// Whether the tick loop is currently running.
    pub running: bool,
    /// Torrents currently tracked (one entry per seeding torrent matching a rule).
    pub torrents_controlled: usize,
    /// Reannounce lookups resolved by the site scraper.
    pub site_success: u64,
    /// Reannounce lookups resolved by the client RPC.
    pub qb_api_success: u64,
    /// Reannounce lookups that fell back to estimation or cache.
    pub fallback_count: u64,
}

/// A rich per-torrent snapshot for `get_state`/`get_all_states`.
#[derive(Debug, Clone, Serialize)]
pub struct TorrentStateSnapshot {
    /// Torrent hash.
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Current control phase.
    pub phase: Phase,
    /// Current announce-cycle index.
    pub cycle_index: u64,
    /// Which oracle source last resolved time-left.
    pub reannounce_source: ReannounceSource,
    /// Projected bytes uploaded over the cached time-left, from the Kalman
    /// filter's current estimate.
    pub predicted_upload: f64,
    /// Bytes still needed to reach this cycle's target, or `0.0` once met.
    pub target_distance: f64,
    /// Percent of this cycle's target already uploaded, `0.0..=100.0`+.
    pub progress_pct: f64,
    /// Last rate limit applied, bytes/s, or `-1` for uncapped.
    pub last_limit: i64,
    /// Short tag explaining `last_limit`'s provenance.
    pub last_limit_reason: String,
}

impl TorrentStateSnapshot {
    /// Project a rich snapshot from a torrent's persisted control state, as
    /// of wall-clock `now` and the torrent's `current_uploaded` reading.
    #[must_use]
    pub fn from_state(state: &TorrentLimitState, current_uploaded: i64, now: f64) -> Self {
        let phase = state.phase(state.cached_time_left);
        let cycle_uploaded = state.cycle_uploaded(current_uploaded) as f64;
        let elapsed = (now - state.cycle_start).max(0.0);
        let total_cycle_time = elapsed + state.cached_time_left.max(0.0);
        let target_total = state.target_speed as f64 * total_cycle_time;
        let progress_pct = if target_total > 0.0 {
            (cycle_uploaded / target_total) * 100.0
        } else {
            0.0
        };

        Self {
            hash: state.hash.clone(),
            name: state.name.clone(),
            phase,
            cycle_index: state.cycle_index,
            reannounce_source: state.reannounce_source,
            predicted_upload: predicted_upload(&state.kalman, state.cached_time_left),
            target_distance: (target_total - cycle_uploaded).max(0.0),
            progress_pct,
            last_limit: state.last_limit,
            last_limit_reason: state.last_limit_reason.clone(),
        }
    }
}

fn predicted_upload(kalman: &KalmanFilter, time_left: f64) -> f64 {
    kalman.predict_upload(time_left.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_progress_and_limit() {
        let mut state = TorrentLimitState::new("h", "n", "t", 1, 0.0, 0, 1000);
        state.cached_time_left = 100.0;
        state.last_limit = 4096;
        state.last_limit_reason = "S:1K/site".to_string();
        let snapshot = TorrentStateSnapshot::from_state(&state, 50_000, 10.0);
        assert_eq!(snapshot.hash, "h");
        assert_eq!(snapshot.last_limit, 4096);
        assert!(snapshot.progress_pct >= 0.0);
    }
}
