//! Per-tick rate computation: turns a torrent's control state, the current
//! upload reading, and the reconciled time-left into a new rate limit.

use crate::oracle::ReannounceSource;
use crate::pid::pid_params;
use crate::state::{Phase, TorrentLimitState};
use crate::{MAX_LIMIT, MIN_LIMIT, UNCAPPED};

/// A computed rate-limit decision plus enough context to log it.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitDecision {
    /// Chosen limit, bytes/s, or [`UNCAPPED`].
    pub limit: i64,
    /// Short tag explaining the decision's provenance.
    pub reason: String,
    /// Control phase the decision was made under.
    pub phase: Phase,
    /// Fraction of the cycle's target already uploaded, `0.0` if unknown.
    pub progress: f64,
    /// Instantaneous required rate to hit the target by the next announce.
    pub required_speed: f64,
}

fn source_tag(source: ReannounceSource) -> &'static str {
    match source {
        ReannounceSource::Site => "site",
        ReannounceSource::QbApi => "qb",
        ReannounceSource::Estimated => "est",
        ReannounceSource::Cached => "cache",
    }
}

/// Round `value` to the nearest multiple of `step`, half rounding up.
fn round_to_step(value: i64, step: i64) -> i64 {
    ((value + step / 2).div_euclid(step)) * step
}

/// Advance one torrent's control state for this tick and compute its new
/// upload rate limit.
///
/// Performs, in order: the Kalman speed update, an uploaded-bytes-regressed
/// resync, new-announce-cycle detection (with a fixed tolerance of 30s),
/// phase classification, and the phase-specific rate formula from the
/// governor spec. Mutates `state`'s cycle bookkeeping, PID, and Kalman
/// filter in place; does **not** mutate `state.last_limit` — the caller
/// decides whether to push the computed limit to the client driver and,
/// only on success, records it.
pub fn compute_limit(
    state: &mut TorrentLimitState,
    current_uploaded: i64,
    current_speed: f64,
    now: f64,
    time_left: f64,
    source: ReannounceSource,
) -> LimitDecision {
    state.resync_if_uploaded_regressed(now, current_uploaded);
    state.kalman.update(current_speed, now);
    state.reannounce_source = source;

    if state.is_new_cycle(time_left) {
        state.start_new_cycle(now, current_uploaded, time_left);
    }

    state.cached_time_left = time_left;
    if !state.cycle_synced && time_left > 0.0 {
        state.cycle_synced = true;
    }

    // Sync status is updated above before classifying the phase, so the
    // tick that first observes a real announce boundary is classified
    // straight into catch/steady/finish rather than lingering in warmup.
    let phase = state.phase(time_left);
    state.pid.set_phase(phase);

    let elapsed = now - state.cycle_start;
    let total_cycle_time = elapsed + time_left;
    let target_total = state.target_speed as f64 * total_cycle_time;
    let cycle_uploaded = state.cycle_uploaded(current_uploaded) as f64;
    let need = (target_total - cycle_uploaded).max(0.0);
    let progress = if target_total > 0.0 {
        cycle_uploaded / target_total
    } else {
        0.0
    };

    let tag = source_tag(source);

    if time_left <= 0.0 {
        return LimitDecision {
            limit: UNCAPPED,
            reason: "announcing".to_string(),
            phase,
            progress,
            required_speed: 0.0,
        };
    }

    let required_speed = need / time_left;
    let pid_gain = state.pid.update(target_total, cycle_uploaded, now);
    let headroom = pid_params(phase).headroom;

    let (raw_limit, reason) = match phase {
        Phase::Finish => {
            let predicted_total = cycle_uploaded + state.kalman.predict_upload(time_left);
            let predicted_ratio = if target_total > 0.0 {
                predicted_total / target_total
            } else {
                0.0
            };
            let correction = if predicted_ratio > 1.002 {
                (1.0 - (predicted_ratio - 1.0) * 3.0).max(0.8)
            } else if predicted_ratio < 0.998 {
                (1.0 + (1.0 - predicted_ratio) * 3.0).min(1.2)
            } else {
                1.0
            };
            let limit = (required_speed * pid_gain * correction) as i64;
            (limit, format!("F:{}K/{tag}", (required_speed / 1024.0) as i64))
        }
        Phase::Steady => {
            let limit = (required_speed * headroom * pid_gain) as i64;
            (limit, format!("S:{}K/{tag}", (required_speed / 1024.0) as i64))
        }
        Phase::Catch => {
            if required_speed > state.target_speed as f64 * 5.0 {
                (UNCAPPED, format!("C:falling_behind/{tag}"))
            } else {
                let limit = (required_speed * headroom * pid_gain) as i64;
                (limit, format!("C:{}K/{tag}", (required_speed / 1024.0) as i64))
            }
        }
        Phase::Warmup => {
            if progress >= 1.0 {
                (MIN_LIMIT, format!("W:done/{tag}"))
            } else if progress >= 0.8 {
                let limit = (required_speed * 1.01 * pid_gain) as i64;
                (limit, format!("W:precise/{tag}"))
            } else if progress >= 0.5 {
                let limit = (required_speed * 1.05) as i64;
                (limit, format!("W:warm/{tag}"))
            } else {
                (UNCAPPED, format!("W:idle/{tag}"))
            }
        }
    };

    let limit = if raw_limit > 0 {
        let clamped = raw_limit.clamp(MIN_LIMIT, MAX_LIMIT);
        let step = if phase == Phase::Finish { 1024 } else { 4096 };
        round_to_step(clamped, step)
    } else {
        raw_limit
    };

    LimitDecision {
        limit,
        reason,
        phase,
        progress,
        required_speed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_target(target_speed: i64) -> TorrentLimitState {
        TorrentLimitState::new("hash", "name", "tracker", 1, 0.0, 0, target_speed)
    }

    #[test]
    fn first_synced_tick_skips_warmup_and_goes_straight_to_catch() {
        let mut state = state_with_target(5 * 1024 * 1024);
        state.cycle_synced = false;
        state.cycle_start = 0.0;
        state.cycle_uploaded_start = 0;
        let decision = compute_limit(
            &mut state,
            0, // no bytes uploaded yet this cycle -> progress stays low
            1000.0,
            1500.0,
            1800.0,
            ReannounceSource::Cached,
        );
        assert!(state.cycle_synced);
        assert_eq!(decision.phase, Phase::Catch);
    }

    #[test]
    fn warmup_persists_while_time_left_stays_non_positive() {
        let mut state = state_with_target(5 * 1024 * 1024);
        state.cycle_synced = false;
        let decision = compute_limit(&mut state, 0, 0.0, 10.0, 0.0, ReannounceSource::Cached);
        assert!(!state.cycle_synced);
        assert_eq!(decision.phase, Phase::Warmup);
        assert_eq!(decision.limit, UNCAPPED);
        assert_eq!(decision.reason, "announcing");
    }

    #[test]
    fn finish_overshoot_applies_correction_and_rounds_to_1024() {
        let mut state = state_with_target(1_000_000);
        state.cycle_synced = true;
        state.cycle_start = 0.0;
        state.cycle_uploaded_start = 0;
        state.cached_time_left = 40.0;
        let total_cycle_time = 1990.0 + 10.0;
        let target_total = 1_000_000.0 * total_cycle_time;
        let cycle_uploaded = (target_total * 0.98) as i64;

        let decision = compute_limit(
            &mut state,
            cycle_uploaded,
            1_000_000.0,
            1990.0,
            10.0,
            ReannounceSource::QbApi,
        );

        assert_eq!(decision.phase, Phase::Finish);
        assert!(decision.reason.starts_with("F:"));
        if decision.limit > 0 {
            assert_eq!(decision.limit % 1024, 0);
        }
    }

    #[test]
    fn new_cycle_detection_increments_index_and_resets_pid() {
        let mut state = state_with_target(1_000_000);
        state.cycle_synced = true;
        state.cached_time_left = 60.0;
        state.cycle_uploaded_start = 0;
        let _ = state.pid.update(1000.0, 0.0, 1.0);

        let decision = compute_limit(&mut state, 5000, 500.0, 100.0, 1780.0, ReannounceSource::Site);

        assert_eq!(state.cycle_index, 1);
        assert_eq!(state.cycle_uploaded_start, 5000);
        assert_eq!(decision.phase, Phase::Catch);
    }

    #[test]
    fn announcing_yields_uncapped_distinct_reason() {
        let mut state = state_with_target(1_000_000);
        state.cycle_synced = true;
        let decision = compute_limit(&mut state, 0, 0.0, 10.0, 0.0, ReannounceSource::Cached);
        assert_eq!(decision.limit, UNCAPPED);
        assert_eq!(decision.reason, "announcing");
    }

    #[test]
    fn catch_phase_uncapped_when_falling_behind() {
        let mut state = state_with_target(1000);
        state.cycle_synced = true;
        state.cycle_start = 0.0;
        state.cycle_uploaded_start = 0;
        let decision = compute_limit(&mut state, 0, 0.0, 1000.0, 1000.0, ReannounceSource::Cached);
        assert_eq!(decision.phase, Phase::Catch);
        assert_eq!(decision.limit, UNCAPPED);
        assert!(decision.reason.starts_with("C:falling_behind"));
    }

    #[test]
    fn limit_is_within_bounds_and_step_aligned() {
        let mut state = state_with_target(10 * 1024 * 1024);
        state.cycle_synced = true;
        state.cycle_start = 0.0;
        state.cycle_uploaded_start = 0;
        let decision = compute_limit(&mut state, 1000, 2_000_000.0, 50.0, 150.0, ReannounceSource::Cached);
        if decision.limit > 0 {
            assert!(decision.limit >= MIN_LIMIT);
            assert!(decision.limit <= MAX_LIMIT);
            assert_eq!(decision.limit % 4096, 0);
        }
    }

    #[test]
    fn uploaded_regression_mid_tick_resyncs_before_computing() {
        let mut state = state_with_target(1_000_000);
        state.cycle_synced = true;
        state.cycle_start = 0.0;
        state.cycle_uploaded_start = 1_000_000;
        state.cycle_index = 2;
        let _ = compute_limit(&mut state, 10, 0.0, 10.0, 1800.0, ReannounceSource::Cached);
        assert_eq!(state.cycle_index, 3);
        assert_eq!(state.cycle_uploaded_start, 10);
    }
}
