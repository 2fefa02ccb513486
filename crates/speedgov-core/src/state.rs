//! Per-torrent control state: announce cycle bookkeeping plus the PID and
//! Kalman estimators it exclusively owns.

use serde::{Deserialize, Serialize};

use crate::kalman::KalmanFilter;
use crate::oracle::ReannounceSource;
use crate::pid::PidController;

/// Seconds remaining below which the cycle enters the `finish` phase.
pub const FINISH_TIME: f64 = 30.0;
/// Seconds remaining below which the cycle enters the `steady` phase.
pub const STEADY_TIME: f64 = 120.0;
/// Tolerance added to the last known time-left before a jump is treated as
/// the start of a new announce cycle.
pub const NEW_CYCLE_TOLERANCE: f64 = 30.0;

/// The regime of the announce cycle, driving PID gains and rate-computation
/// shape (Table P).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not yet synced to a real announce boundary.
    Warmup,
    /// Synced, but comfortably far from the next announce.
    Catch,
    /// Within [`STEADY_TIME`] seconds of the next announce.
    Steady,
    /// Within [`FINISH_TIME`] seconds of the next announce.
    Finish,
}

/// Classify the current phase from seconds-left and sync status.
#[must_use]
pub fn phase_for(time_left: f64, cycle_synced: bool) -> Phase {
    if !cycle_synced {
        return Phase::Warmup;
    }
    if time_left <= FINISH_TIME {
        return Phase::Finish;
    }
    if time_left <= STEADY_TIME {
        return Phase::Steady;
    }
    Phase::Catch
}

/// Persistent per-torrent control state. Identity and cycle bookkeeping for
/// one torrent hash, plus the PID controller and Kalman filter that estimate
/// its progress; owned exclusively by the governor's state table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentLimitState {
    /// Opaque torrent hash, the table key.
    pub hash: String,
    /// Truncated torrent name, for logs.
    pub name: String,
    /// Tracker announce URL.
    pub tracker: String,
    /// Owning BitTorrent client instance id.
    pub instance_id: i64,
    /// Matched PT site id, once resolved by the scraper.
    pub site_id: Option<i64>,
    /// Tracker-side torrent id, once resolved by the scraper.
    pub tid: Option<i64>,

    /// Monotonically increasing announce-cycle counter.
    pub cycle_index: u64,
    /// Wall-clock seconds at which the current cycle began.
    pub cycle_start: f64,
    /// Bytes uploaded (client-reported) at the start of the current cycle.
    pub cycle_uploaded_start: i64,
    /// Whether a real announce boundary has ever been observed.
    pub cycle_synced: bool,

    /// Absolute wall-clock of the next announce, when known.
    pub reannounce_time: f64,
    /// Last known seconds-to-next-announce, used as the final fallback.
    pub cached_time_left: f64,
    /// Which oracle source produced `cached_time_left` most recently.
    pub reannounce_source: ReannounceSource,

    /// Target upload rate for this torrent, bytes/s.
    pub target_speed: i64,
    /// Last rate limit applied, bytes/s, or -1 for uncapped.
    pub last_limit: i64,
    /// Short tag explaining `last_limit`'s provenance.
    pub last_limit_reason: String,

    /// Phase-switched PID controller, owned exclusively by this state.
    pub pid: PidController,
    /// Constant-acceleration Kalman filter, owned exclusively by this state.
    pub kalman: KalmanFilter,

    /// Wall-clock time of the last status log line for this torrent.
    pub last_log_time: f64,
}

impl TorrentLimitState {
    /// Construct freshly observed state for a torrent first seen seeding at
    /// `now`, with `uploaded_at_start` bytes already uploaded and a target
    /// rate of `target_speed` bytes/s.
    #[must_use]
    pub fn new(
        hash: impl Into<String>,
        name: impl Into<String>,
        tracker: impl Into<String>,
        instance_id: i64,
        now: f64,
        uploaded_at_start: i64,
        target_speed: i64,
    ) -> Self {
        Self {
            hash: hash.into(),
            name: name.into(),
            tracker: tracker.into(),
            instance_id,
            site_id: None,
            tid: None,
            cycle_index: 0,
            cycle_start: now,
            cycle_uploaded_start: uploaded_at_start,
            cycle_synced: false,
            reannounce_time: 0.0,
            cached_time_left: 1800.0,
            reannounce_source: ReannounceSource::Cached,
            target_speed,
            last_limit: -1,
            last_limit_reason: String::new(),
            pid: PidController::new(),
            kalman: KalmanFilter::new(),
            last_log_time: 0.0,
        }
    }

    /// Bytes uploaded so far within the current cycle. Never negative, even
    /// if `current_uploaded` momentarily dips below `cycle_uploaded_start`.
    #[must_use]
    pub fn cycle_uploaded(&self, current_uploaded: i64) -> i64 {
        (current_uploaded - self.cycle_uploaded_start).max(0)
    }

    /// Current control phase given `now` and the reconciled time-left.
    #[must_use]
    pub fn phase(&self, time_left: f64) -> Phase {
        phase_for(time_left, self.cycle_synced)
    }

    /// Whether `time_left` represents a jump past the previous announce,
    /// i.e. a new cycle has begun (spec tolerance: [`NEW_CYCLE_TOLERANCE`]).
    #[must_use]
    pub fn is_new_cycle(&self, time_left: f64) -> bool {
        self.cycle_synced && time_left > self.cached_time_left + NEW_CYCLE_TOLERANCE
    }

    /// Roll the state over into a fresh announce cycle: reset the PID,
    /// rebase the uploaded-bytes counter, and bump the cycle index.
    pub fn start_new_cycle(&mut self, now: f64, current_uploaded: i64, time_left: f64) {
        self.cycle_start = now;
        self.cycle_uploaded_start = current_uploaded;
        self.cycle_index += 1;
        self.pid.reset();
        self.reannounce_time = now + time_left;
        self.cached_time_left = time_left;
    }

    /// If the client reports uploaded bytes lower than the cycle start
    /// marker (a client restart or a stats reset), treat it as an implicit
    /// new cycle anchored at the current reading.
    pub fn resync_if_uploaded_regressed(&mut self, now: f64, current_uploaded: i64) {
        if current_uploaded < self.cycle_uploaded_start {
            self.cycle_start = now;
            self.cycle_uploaded_start = current_uploaded;
            self.cycle_index += 1;
            self.pid.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_thresholds() {
        assert_eq!(phase_for(1000.0, false), Phase::Warmup);
        assert_eq!(phase_for(1000.0, true), Phase::Catch);
        assert_eq!(phase_for(100.0, true), Phase::Steady);
        assert_eq!(phase_for(20.0, true), Phase::Finish);
        assert_eq!(phase_for(30.0, true), Phase::Finish);
        assert_eq!(phase_for(120.0, true), Phase::Steady);
    }

    #[test]
    fn cycle_uploaded_never_negative() {
        let state = TorrentLimitState::new("h", "n", "t", 1, 0.0, 1000, 1024);
        assert_eq!(state.cycle_uploaded(500), 0);
        assert_eq!(state.cycle_uploaded(1500), 500);
    }

    #[test]
    fn new_cycle_detection_uses_tolerance() {
        let mut state = TorrentLimitState::new("h", "n", "t", 1, 0.0, 0, 1024);
        state.cycle_synced = true;
        state.cached_time_left = 60.0;
        assert!(!state.is_new_cycle(80.0));
        assert!(state.is_new_cycle(1780.0));
    }

    #[test]
    fn uploaded_regression_triggers_resync() {
        let mut state = TorrentLimitState::new("h", "n", "t", 1, 0.0, 1_000_000, 1024);
        state.cycle_index = 3;
        state.resync_if_uploaded_regressed(500.0, 100);
        assert_eq!(state.cycle_index, 4);
        assert_eq!(state.cycle_uploaded_start, 100);
        assert_eq!(state.cycle_start, 500.0);
    }

    #[test]
    fn start_new_cycle_resets_pid_and_rebase() {
        let mut state = TorrentLimitState::new("h", "n", "t", 1, 0.0, 1000, 1024);
        let _ = state.pid.update(1000.0, 0.0, 1.0);
        state.start_new_cycle(100.0, 5000, 1800.0);
        assert_eq!(state.cycle_index, 1);
        assert_eq!(state.cycle_uploaded_start, 5000);
        assert_eq!(state.cycle_start, 100.0);
        assert_eq!(state.reannounce_time, 100.0 + 1800.0);
    }
}
