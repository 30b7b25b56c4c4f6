//! Application configuration, loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::geometry::{NamedPolygon, PixelPoint, Polygon};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub geometry: GeometryConfig,
    pub mesh: MeshConfig,
    pub tracking: TrackingConfig,
    pub color: ColorConfig,
    pub calculation: CalculationConfig,
    pub general: GeneralConfig,
}

/// Zones and the calibration trapezoid, all in frame pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Region where calibration is trusted. Empty disables zone processing.
    pub validation_zone: Polygon,
    /// Lane polygons, checked in order.
    pub lanes: Vec<NamedPolygon>,
    /// Top-left, top-right, bottom-right, bottom-left.
    pub calibration_region: [PixelPoint; 4],
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            validation_zone: Polygon::default(),
            lanes: Vec::new(),
            calibration_region: [
                PixelPoint::new(520.0, 300.0),
                PixelPoint::new(760.0, 310.0),
                PixelPoint::new(1180.0, 700.0),
                PixelPoint::new(100.0, 690.0),
            ],
        }
    }
}

/// Shape of the calibration lattice and its real-world spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub rows: usize,
    pub columns: usize,
    /// Extra rows extrapolated below the bottom edge.
    pub rows_before: usize,
    /// Extra rows extrapolated beyond the top edge.
    pub rows_after: usize,
    pub row_spacing: f64,
    pub column_spacing: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            columns: 4,
            rows_before: 0,
            rows_after: 0,
            row_spacing: 3000.0,
            column_spacing: 3500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub max_frames_lost: u32,
    pub iou_threshold: f32,
    /// Share of the appearance term in the re-association cost.
    pub color_weight: f32,
    pub kalman_process_noise: f64,
    pub kalman_measurement_noise: f64,
    pub kalman_initial_velocity_variance: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_frames_lost: 30,
            iou_threshold: 0.3,
            color_weight: 0.3,
            kalman_process_noise: 1e-2,
            kalman_measurement_noise: 1e-1,
            kalman_initial_velocity_variance: 1e8,
        }
    }
}

/// Dominant colour and histogram parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub k_clusters: usize,
    pub max_iter: usize,
    pub epsilon: f64,
    pub attempts: usize,
    /// Frames between dominant colour refreshes of the same track.
    pub recalculation_interval: u32,
    /// Clusters closer than this to a background colour are ignored.
    pub color_threshold: f64,
    pub background_colors: Vec<[u8; 3]>,
    /// Hue and saturation bin counts.
    pub histogram_bins: [usize; 2],
    pub seed: u64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            k_clusters: 3,
            max_iter: 10,
            epsilon: 1.0,
            attempts: 3,
            recalculation_interval: 15,
            color_threshold: 50.0,
            background_colors: Vec::new(),
            histogram_bins: [180, 256],
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationConfig {
    pub speed_min_kmh: f64,
    pub speed_max_kmh: f64,
    /// Calibrated units per metre (1000 when the mesh is in millimetres).
    pub units_per_meter: f64,
    pub mps_to_kmh: f64,
    pub fps: f64,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            speed_min_kmh: 0.0,
            speed_max_kmh: 200.0,
            units_per_meter: 1000.0,
            mps_to_kmh: 3.6,
            fps: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub enable_speed: bool,
    pub enable_validation_zone: bool,
    /// Inference-to-frame box divisor; 1.0 when the detector sees full frames.
    pub inference_scale: f32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enable_speed: true,
            enable_validation_zone: true,
            inference_scale: 1.0,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let zone = &self.geometry.validation_zone;
        if !zone.is_empty() && zone.points.len() < 3 {
            return Err(TrackError::config("validation zone needs at least 3 points"));
        }
        for lane in &self.geometry.lanes {
            if lane.points.points.len() < 3 {
                return Err(TrackError::config(format!(
                    "lane '{}' needs at least 3 points",
                    lane.name
                )));
            }
        }
        if self.mesh.rows < 2 || self.mesh.columns < 2 {
            return Err(TrackError::config("mesh needs at least 2 rows and 2 columns"));
        }
        if !(self.mesh.row_spacing > 0.0 && self.mesh.column_spacing > 0.0) {
            return Err(TrackError::config("mesh spacing must be positive"));
        }
        if !(0.0..=1.0).contains(&self.tracking.iou_threshold) {
            return Err(TrackError::config("iou_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.tracking.color_weight) {
            return Err(TrackError::config("color_weight must be within [0, 1]"));
        }
        if self.color.k_clusters == 0 {
            return Err(TrackError::config("k_clusters must be at least 1"));
        }
        if self.color.histogram_bins.contains(&0) {
            return Err(TrackError::config("histogram bins must be non-zero"));
        }
        let calc = &self.calculation;
        if !(calc.fps > 0.0) {
            return Err(TrackError::config("fps must be positive"));
        }
        if !(calc.units_per_meter > 0.0) {
            return Err(TrackError::config("units_per_meter must be positive"));
        }
        if calc.speed_min_kmh >= calc.speed_max_kmh {
            return Err(TrackError::config("speed_min_kmh must be below speed_max_kmh"));
        }
        if !(self.general.inference_scale > 0.0) {
            return Err(TrackError::config("inference_scale must be positive"));
        }
        Ok(())
    }
}
