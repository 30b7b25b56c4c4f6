//! Appearance features: dominant colour and hue/saturation histograms.

mod background;
mod dominant_color;
mod histogram;

pub use background::{background_color, learn_background_color};
pub use dominant_color::{KMeansParams, dominant_color};
pub use histogram::{HsHistogram, histogram_distance, rgb_to_hsv8};

use image::RgbImage;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::ColorConfig;
use crate::geometry::Rect;

/// Per-box appearance descriptors with the configured parameters.
///
/// Owns the k-means random source so results are reproducible for a given
/// seed and frame sequence.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    params: KMeansParams,
    background: Vec<[u8; 3]>,
    color_threshold: f64,
    histogram_bins: [usize; 2],
    rng: StdRng,
}

impl FeatureExtractor {
    pub fn new(config: &ColorConfig) -> Self {
        Self {
            params: KMeansParams {
                k: config.k_clusters,
                max_iter: config.max_iter,
                epsilon: config.epsilon,
                attempts: config.attempts,
            },
            background: config.background_colors.clone(),
            color_threshold: config.color_threshold,
            histogram_bins: config.histogram_bins,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Add a colour whose clusters should never count as dominant.
    pub fn add_background_color(&mut self, color: [u8; 3]) {
        self.background.push(color);
    }

    pub fn dominant_color(&mut self, frame: &RgbImage, rect: &Rect) -> Option<[u8; 3]> {
        dominant_color(
            frame,
            rect,
            &self.params,
            &self.background,
            self.color_threshold,
            &mut self.rng,
        )
    }

    pub fn histogram(&self, frame: &RgbImage, rect: &Rect) -> Option<HsHistogram> {
        HsHistogram::from_region(frame, rect, self.histogram_bins)
    }
}
