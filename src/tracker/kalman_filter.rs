//! Constant-velocity Kalman filter over world-plane positions, using ndarray
//! and a nalgebra-based inverse.

use ndarray::{Array1, Array2, array};

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_cov: Array2<f64>,
    measurement_cov: Array2<f64>,
    measurement_noise: f64,
    initial_velocity_variance: f64,
}

impl KalmanFilter {
    /// State is `[x, y, vx, vy]`, measurement is `[x, y]`.
    ///
    /// `dt` is the time between frames, the noise terms are variances on the
    /// diagonal of Q and R.
    pub fn new(
        dt: f64,
        process_noise: f64,
        measurement_noise: f64,
        initial_velocity_variance: f64,
    ) -> Self {
        let motion_mat = array![
            [1.0, 0.0, dt, 0.0],
            [0.0, 1.0, 0.0, dt],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let update_mat = array![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];

        Self {
            motion_mat,
            update_mat,
            process_cov: Array2::eye(4) * process_noise,
            measurement_cov: Array2::eye(2) * measurement_noise,
            measurement_noise,
            initial_velocity_variance,
        }
    }

    /// Start a track at `measurement` with zero velocity.
    pub fn initiate(&self, measurement: [f64; 2]) -> (Array1<f64>, Array2<f64>) {
        let mean = array![measurement[0], measurement[1], 0.0, 0.0];
        let mut cov = Array2::zeros((4, 4));
        cov[[0, 0]] = self.measurement_noise;
        cov[[1, 1]] = self.measurement_noise;
        cov[[2, 2]] = self.initial_velocity_variance;
        cov[[3, 3]] = self.initial_velocity_variance;
        (mean, cov)
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_cov;
        (new_mean, new_covariance)
    }

    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_cov;
        (mean_proj, covariance_proj)
    }

    /// Correct a predicted state with a measurement. `None` if the innovation
    /// covariance is singular.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 2],
    ) -> Option<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let innovation = array![measurement[0], measurement[1]] - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_2x2(&projected_cov)?;
        let pht = covariance.dot(&self.update_mat.t());
        let kalman_gain = pht.dot(&s_inv);

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Some((new_mean, new_covariance))
    }
}

fn invert_2x2(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix2::new(m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);
    let inv = nm.try_inverse()?;
    Some(array![[inv[(0, 0)], inv[(0, 1)]], [inv[(1, 0)], inv[(1, 1)]]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new(1.0 / 30.0, 1e-2, 1e-1, 1e4);
        let (mean, cov) = kf.initiate([100.0, 200.0]);
        assert_eq!(mean, array![100.0, 200.0, 0.0, 0.0]);
        assert_eq!(cov[[0, 0]], 1e-1);
        assert_eq!(cov[[3, 3]], 1e4);
    }

    #[test]
    fn test_predict_moves_by_velocity() {
        let kf = KalmanFilter::new(0.5, 0.0, 1.0, 1.0);
        let mean = array![1.0, 2.0, 4.0, -2.0];
        let (predicted, _) = kf.predict(&mean, &Array2::eye(4));
        assert_eq!(predicted, array![3.0, 1.0, 4.0, -2.0]);
    }

    #[test]
    fn test_converges_to_constant_velocity() {
        let dt = 1.0 / 30.0;
        let kf = KalmanFilter::new(dt, 1e-2, 1e-2, 1e4);
        let (mut mean, mut cov) = kf.initiate([0.0, 0.0]);
        for step in 1..60 {
            let t = step as f64 * dt;
            let (m, c) = kf.predict(&mean, &cov);
            (mean, cov) = kf.update(&m, &c, [15.0 * t, 0.0]).unwrap();
        }
        assert_abs_diff_eq!(mean[2], 15.0, epsilon = 0.5);
        assert_abs_diff_eq!(mean[3], 0.0, epsilon = 0.5);
    }

    #[test]
    fn test_singular_innovation() {
        let kf = KalmanFilter::new(1.0, 0.0, 0.0, 0.0);
        let mean = Array1::zeros(4);
        let cov = Array2::zeros((4, 4));
        assert!(kf.update(&mean, &cov, [1.0, 1.0]).is_none());
    }
}
