//! Phase-aware PID controller producing a dimensionless gain.

use serde::{Deserialize, Serialize};

use crate::state::Phase;

const INTEGRAL_CLAMP: f64 = 0.5;
const OUTPUT_MIN: f64 = 0.3;
const OUTPUT_MAX: f64 = 3.0;

/// Fixed gains and safety headroom for one control phase (Table P).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseParams {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Multiplicative safety headroom applied on top of the required rate.
    pub headroom: f64,
}

/// Look up the immutable PID parameters for a phase (Table P).
#[must_use]
pub const fn pid_params(phase: Phase) -> PhaseParams {
    match phase {
        Phase::Warmup => PhaseParams {
            kp: 0.3,
            ki: 0.05,
            kd: 0.02,
            headroom: 1.03,
        },
        Phase::Catch => PhaseParams {
            kp: 0.5,
            ki: 0.10,
            kd: 0.05,
            headroom: 1.02,
        },
        Phase::Steady => PhaseParams {
            kp: 0.6,
            ki: 0.15,
            kd: 0.08,
            headroom: 1.005,
        },
        Phase::Finish => PhaseParams {
            kp: 0.8,
            ki: 0.20,
            kd: 0.12,
            headroom: 1.001,
        },
    }
}

/// A phase-switched PID controller. Owned exclusively by one
/// [`crate::state::TorrentLimitState`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidController {
    integral: f64,
    last_error: f64,
    last_time: f64,
    phase: Phase,
}

impl Default for PidController {
    fn default() -> Self {
        Self::new()
    }
}

impl PidController {
    /// Construct a controller at rest, starting in the warmup phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            integral: 0.0,
            last_error: 0.0,
            last_time: 0.0,
            phase: Phase::Warmup,
        }
    }

    /// Current control phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Switch phases. Halves the integral accumulator on an actual
    /// transition as anti-windup for the regime change; a no-op otherwise.
    pub fn set_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            self.integral *= 0.5;
            self.phase = phase;
        }
    }

    /// Advance the controller and return the clamped gain `[0.3, 3.0]`.
    pub fn update(&mut self, target: f64, actual: f64, now: f64) -> f64 {
        let params = pid_params(self.phase);
        let error = if target.max(1.0) == 0.0 {
            0.0
        } else {
            (target - actual) / target.max(1.0)
        };

        let dt = if self.last_time > 0.0 {
            now - self.last_time
        } else {
            1.0
        };
        self.last_time = now;

        self.integral = (self.integral + error * dt).clamp(-INTEGRAL_CLAMP, INTEGRAL_CLAMP);

        let derivative = if dt > 0.0 {
            (error - self.last_error) / dt
        } else {
            0.0
        };
        self.last_error = error;

        let output = 1.0 + params.kp * error + params.ki * self.integral + params.kd * derivative;
        output.clamp(OUTPUT_MIN, OUTPUT_MAX)
    }

    /// Zero the integral, last-error, and last-time fields.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_output_toward_one_at_zero_error() {
        let mut pid = PidController::new();
        pid.set_phase(Phase::Steady);
        let gain = pid.update(100.0, 100.0, 1.0);
        assert!((gain - 1.0).abs() < 1e-9);
    }

    #[test]
    fn phase_switch_halves_integral() {
        let mut pid = PidController::new();
        pid.set_phase(Phase::Catch);
        let _ = pid.update(100.0, 10.0, 1.0);
        let _ = pid.update(100.0, 10.0, 2.0);
        let integral_before = pid.integral;
        pid.set_phase(Phase::Steady);
        assert!((pid.integral - integral_before * 0.5).abs() < 1e-9);
    }

    #[test]
    fn output_is_clamped() {
        let mut pid = PidController::new();
        pid.set_phase(Phase::Finish);
        for step in 0..50 {
            let now = f64::from(step) + 1.0;
            let gain = pid.update(1000.0, 0.0, now);
            assert!((0.3..=3.0).contains(&gain));
        }
    }

    #[test]
    fn reset_zeroes_state() {
        let mut pid = PidController::new();
        let _ = pid.update(100.0, 10.0, 5.0);
        pid.reset();
        assert_eq!(pid.integral, 0.0);
        assert_eq!(pid.last_error, 0.0);
        assert_eq!(pid.last_time, 0.0);
    }
}
