//! Perspective calibration: a pixel to ground-plane homography derived from
//! one hand-specified trapezoid.
//!
//! [`PerspectiveCalibrator`] finds the two vanishing points of the trapezoid
//! and lays a perspective-correct lattice over it. The lattice is paired with
//! a regular real-world grid and a [`Homography`] is fitted to the pairs.

mod calibrator;
mod homography;
mod mesh;

pub use calibrator::PerspectiveCalibrator;
pub use homography::Homography;
pub use mesh::CalibrationMesh;

use tracing::info;

use crate::config::{GeometryConfig, MeshConfig};
use crate::error::{Result, TrackError};

/// Result of startup calibration. Immutable once built.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub homography: Homography,
    pub mesh: CalibrationMesh,
}

impl Calibration {
    /// Run the full calibration. Any failure here must abort the run before
    /// the first frame is processed.
    pub fn from_config(geometry: &GeometryConfig, mesh_config: &MeshConfig) -> Result<Self> {
        let calibrator = PerspectiveCalibrator::new(geometry.calibration_region)?;
        let mesh = calibrator.mesh(
            mesh_config.rows,
            mesh_config.columns,
            mesh_config.rows_before,
            mesh_config.rows_after,
        );

        if mesh.is_empty() {
            return Err(TrackError::calibration("calibration mesh is empty"));
        }

        let (pixels, world) =
            mesh.correspondences(mesh_config.row_spacing, mesh_config.column_spacing);
        let homography = Homography::fit(&pixels, &world)?;

        info!(
            rows = mesh.num_rows(),
            columns = mesh.num_columns(),
            "homography fitted from calibration mesh"
        );

        Ok(Self { homography, mesh })
    }
}
