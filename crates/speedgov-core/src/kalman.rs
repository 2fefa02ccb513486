//! Constant-acceleration Kalman filter tracking smoothed upload speed.

use serde::{Deserialize, Serialize};

const Q_SPEED: f64 = 0.1;
const Q_ACCEL: f64 = 0.05;
const MEASUREMENT_NOISE: f64 = 0.5;

/// Tracks smoothed upload speed and acceleration with their variances. Owned
/// exclusively by one [`crate::state::TorrentLimitState`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KalmanFilter {
    /// Smoothed upload speed estimate, bytes/s.
    pub speed: f64,
    /// Smoothed acceleration estimate, bytes/s^2.
    pub acceleration: f64,
    p_speed: f64,
    p_accel: f64,
    last_time: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    /// Construct a filter with unit initial variances, unseeded by any
    /// measurement.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            speed: 0.0,
            acceleration: 0.0,
            p_speed: 1.0,
            p_accel: 1.0,
            last_time: 0.0,
        }
    }

    /// Feed one upload-speed measurement at wall-clock time `now`.
    ///
    /// The first call seeds `speed` directly from the measurement; later
    /// calls run a predict/innovate/update cycle. Calls with `now` not after
    /// the previous call are ignored (non-positive `dt`).
    pub fn update(&mut self, measured_speed: f64, now: f64) {
        if self.last_time <= 0.0 {
            self.speed = measured_speed;
            self.last_time = now;
            return;
        }

        let dt = now - self.last_time;
        if dt <= 0.0 {
            return;
        }
        self.last_time = now;

        let predicted_speed = self.speed + self.acceleration * dt;
        self.p_speed += Q_SPEED + self.p_accel * dt * dt;
        self.p_accel += Q_ACCEL;

        let innovation = measured_speed - predicted_speed;
        let gain = self.p_speed / (self.p_speed + MEASUREMENT_NOISE);

        self.speed = predicted_speed + gain * innovation;
        self.acceleration += 0.1 * innovation / dt;
        self.p_speed *= 1.0 - gain;
    }

    /// Project total bytes uploaded over the next `time_left` seconds under
    /// the current speed/acceleration estimate.
    #[must_use]
    pub fn predict_upload(&self, time_left: f64) -> f64 {
        self.speed * time_left + 0.5 * self.acceleration * time_left * time_left
    }

    /// Reset to the unseeded state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_speed_directly() {
        let mut kalman = KalmanFilter::new();
        kalman.update(1000.0, 10.0);
        assert_eq!(kalman.speed, 1000.0);
        assert_eq!(kalman.acceleration, 0.0);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut kalman = KalmanFilter::new();
        kalman.update(1000.0, 10.0);
        kalman.update(2000.0, 10.0);
        assert_eq!(kalman.speed, 1000.0);
    }

    #[test]
    fn tracks_constant_speed() {
        let mut kalman = KalmanFilter::new();
        for tick in 0..20 {
            kalman.update(5000.0, f64::from(tick) + 1.0);
        }
        assert!((kalman.speed - 5000.0).abs() < 50.0);
    }

    #[test]
    fn predict_upload_matches_kinematics() {
        let mut kalman = KalmanFilter::new();
        kalman.speed = 100.0;
        kalman.acceleration = 2.0;
        let predicted = kalman.predict_upload(10.0);
        assert!((predicted - (100.0 * 10.0 + 0.5 * 2.0 * 100.0)).abs() < 1e-9);
    }
}
