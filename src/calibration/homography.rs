//! Pixel to ground-plane homography.

use nalgebra::{DMatrix, Matrix3};

use crate::error::{Result, TrackError};
use crate::geometry::{PixelPoint, WorldPoint};

/// 3x3 projective map from image pixels to calibrated ground coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Least-squares fit over all correspondences (normalised DLT).
    ///
    /// Needs at least four pairs in general position. Collinear or
    /// coincident points leave the solution underdetermined and fail.
    pub fn fit(pixels: &[PixelPoint], world: &[WorldPoint]) -> Result<Self> {
        if pixels.len() != world.len() {
            return Err(TrackError::calibration(format!(
                "correspondence count mismatch: {} pixels vs {} world points",
                pixels.len(),
                world.len()
            )));
        }
        if pixels.len() < 4 {
            return Err(TrackError::calibration(format!(
                "at least 4 correspondences required, got {}",
                pixels.len()
            )));
        }
        if !pixels.iter().all(PixelPoint::is_finite) || !world.iter().all(WorldPoint::is_finite) {
            return Err(TrackError::calibration("non-finite correspondence"));
        }

        let src: Vec<(f64, f64)> = pixels.iter().map(|p| (p.x, p.y)).collect();
        let dst: Vec<(f64, f64)> = world.iter().map(|p| (p.x, p.y)).collect();
        let t_src = normalization(&src)?;
        let t_dst = normalization(&dst)?;

        let n = src.len();
        // Pad to at least 9 rows so the SVD always yields a full 9x9 V^T.
        let mut a = DMatrix::<f64>::zeros((2 * n).max(9), 9);
        for (k, (s, d)) in src.iter().zip(&dst).enumerate() {
            let (x, y) = apply(&t_src, *s);
            let (u, v) = apply(&t_dst, *d);
            let r = 2 * k;
            a.row_mut(r)
                .copy_from_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
            a.row_mut(r + 1)
                .copy_from_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
        }

        let svd = a.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| TrackError::calibration("SVD did not converge"))?;

        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));
        let smallest = order[0];
        let second = svd.singular_values[order[1]];
        let largest = svd.singular_values[order[order.len() - 1]];
        if second <= 1e-9 * largest {
            return Err(TrackError::calibration(
                "correspondences are degenerate (collinear or coincident points)",
            ));
        }

        let h: Vec<f64> = v_t.row(smallest).iter().copied().collect();
        let h_norm = Matrix3::from_row_slice(&h);

        let t_dst_inv = t_dst
            .try_inverse()
            .ok_or_else(|| TrackError::calibration("singular normalisation"))?;
        let mut matrix = t_dst_inv * h_norm * t_src;

        let scale = if matrix[(2, 2)].abs() > 1e-12 {
            matrix[(2, 2)]
        } else {
            matrix.norm()
        };
        matrix /= scale;

        let det = matrix.determinant();
        if !det.is_finite() || det.abs() < 1e-12 * matrix.norm().powi(3) {
            return Err(TrackError::calibration("fitted homography is singular"));
        }

        Ok(Self { matrix })
    }

    /// Map a pixel onto the ground plane. `None` when the point lies on the
    /// horizon line or the result is not finite.
    pub fn project(&self, p: &PixelPoint) -> Option<WorldPoint> {
        if !p.is_finite() {
            return None;
        }
        let v = self.matrix * p.to_homogeneous();
        if v.z.abs() < f64::EPSILON {
            return None;
        }
        let out = WorldPoint::new(v.x / v.z, v.y / v.z);
        out.is_finite().then_some(out)
    }
}

/// Similarity transform moving the centroid to the origin with a mean
/// distance of sqrt(2).
fn normalization(points: &[(f64, f64)]) -> Result<Matrix3<f64>> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.0 - cx).hypot(p.1 - cy))
        .sum::<f64>()
        / n;

    if !(mean_dist > 1e-12) {
        return Err(TrackError::calibration("all correspondences coincide"));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Matrix3<f64>, (x, y): (f64, f64)) -> (f64, f64) {
    let v = t * nalgebra::Vector3::new(x, y, 1.0);
    (v.x / v.z, v.y / v.z)
}
