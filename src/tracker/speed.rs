//! Per-track speed estimation on the calibrated ground plane.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::calibration::Homography;
use crate::config::{CalculationConfig, TrackingConfig};
use crate::geometry::PixelPoint;
use crate::tracker::TrackId;
use crate::tracker::kalman_filter::KalmanFilter;

/// Filter updates required before a speed is reported.
pub const MIN_UPDATES_FOR_SPEED: u32 = 3;

#[derive(Debug, Clone)]
struct FilterState {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    updates: u32,
}

/// Kalman-smoothed ground speed for each stable track.
#[derive(Debug, Clone)]
pub struct SpeedCalculator {
    homography: Homography,
    kalman: KalmanFilter,
    filters: HashMap<TrackId, FilterState>,
    speed_min_kmh: f64,
    speed_max_kmh: f64,
    units_per_meter: f64,
    mps_to_kmh: f64,
}

impl SpeedCalculator {
    pub fn new(
        homography: Homography,
        tracking: &TrackingConfig,
        calculation: &CalculationConfig,
    ) -> Self {
        let kalman = KalmanFilter::new(
            1.0 / calculation.fps,
            tracking.kalman_process_noise,
            tracking.kalman_measurement_noise,
            tracking.kalman_initial_velocity_variance,
        );
        Self {
            homography,
            kalman,
            filters: HashMap::new(),
            speed_min_kmh: calculation.speed_min_kmh,
            speed_max_kmh: calculation.speed_max_kmh,
            units_per_meter: calculation.units_per_meter,
            mps_to_kmh: calculation.mps_to_kmh,
        }
    }

    /// Feed the pixel position of a track's ground contact point.
    ///
    /// The first observation initialises the filter; later ones run a
    /// predict/correct cycle. Points that do not project onto the ground
    /// plane are ignored.
    pub fn update_position(&mut self, track_id: TrackId, point: PixelPoint) {
        let Some(world) = self.homography.project(&point) else {
            debug!(track_id, x = point.x, y = point.y, "position not projectable, skipped");
            return;
        };
        let measurement = [world.x, world.y];

        match self.filters.get_mut(&track_id) {
            None => {
                let (mean, covariance) = self.kalman.initiate(measurement);
                self.filters.insert(
                    track_id,
                    FilterState {
                        mean,
                        covariance,
                        updates: 1,
                    },
                );
            }
            Some(state) => {
                let (mean, covariance) = self.kalman.predict(&state.mean, &state.covariance);
                match self.kalman.update(&mean, &covariance, measurement) {
                    Some((mean, covariance)) => {
                        state.mean = mean;
                        state.covariance = covariance;
                        state.updates += 1;
                    }
                    None => warn!(track_id, "singular innovation covariance, update dropped"),
                }
            }
        }
    }

    /// Speed in km/h once the filter has enough updates and the value lies
    /// strictly between `speed_min_kmh` and `speed_max_kmh`.
    pub fn get_speed(&self, track_id: TrackId) -> Option<f64> {
        let state = self.filters.get(&track_id)?;
        if state.updates < MIN_UPDATES_FOR_SPEED {
            return None;
        }
        let units_per_second = state.mean[2].hypot(state.mean[3]);
        let speed = units_per_second / self.units_per_meter * self.mps_to_kmh;
        (speed > self.speed_min_kmh && speed < self.speed_max_kmh).then_some(speed)
    }

    pub fn update_count(&self, track_id: TrackId) -> u32 {
        self.filters.get(&track_id).map_or(0, |s| s.updates)
    }

    pub fn remove_filter(&mut self, track_id: TrackId) {
        self.filters.remove(&track_id);
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }
}
