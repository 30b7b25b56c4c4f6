use image::RgbImage;
use ndarray::Array2;

use crate::geometry::Rect;

/// Hue/saturation 2-D histogram of an image region.
///
/// Hue is binned over `[0, 180)` and saturation over `[0, 256)`, the 8-bit
/// HSV convention. Counts are min-max normalised to `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HsHistogram {
    bins: Array2<f32>,
}

impl HsHistogram {
    pub fn from_array(bins: Array2<f32>) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &Array2<f32> {
        &self.bins
    }

    /// Histogram of the part of `rect` inside `frame`. `None` if the clipped
    /// region is empty or the bin counts are zero.
    pub fn from_region(frame: &RgbImage, rect: &Rect, [h_bins, s_bins]: [usize; 2]) -> Option<Self> {
        if h_bins == 0 || s_bins == 0 {
            return None;
        }
        let (x1, y1, x2, y2) = rect.clip_to_frame(frame.width(), frame.height())?;

        let mut bins = Array2::<f32>::zeros((h_bins, s_bins));
        for y in y1..y2 {
            for x in x1..x2 {
                let [r, g, b] = frame.get_pixel(x, y).0;
                let (h, s, _) = rgb_to_hsv8(r, g, b);
                let hi = (usize::from(h) * h_bins / 180).min(h_bins - 1);
                let si = (usize::from(s) * s_bins / 256).min(s_bins - 1);
                bins[[hi, si]] += 1.0;
            }
        }

        normalize_min_max(&mut bins, 255.0);
        Some(Self { bins })
    }

    /// Pearson correlation of the two histograms, in `[-1, 1]`.
    ///
    /// `None` when the shapes differ. Two flat histograms correlate as 1.
    pub fn correlation(&self, other: &HsHistogram) -> Option<f64> {
        if self.bins.dim() != other.bins.dim() || self.bins.is_empty() {
            return None;
        }
        let n = self.bins.len() as f64;
        let mean_a = self.bins.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let mean_b = other.bins.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

        let (mut num, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for (&a, &b) in self.bins.iter().zip(other.bins.iter()) {
            let da = f64::from(a) - mean_a;
            let db = f64::from(b) - mean_b;
            num += da * db;
            var_a += da * da;
            var_b += db * db;
        }

        let denom = var_a * var_b;
        if denom.abs() > f64::EPSILON {
            Some(num / denom.sqrt())
        } else {
            Some(1.0)
        }
    }
}

/// Appearance distance `1 - max(correlation, 0)`, in `[0, 1]`.
///
/// Missing or incomparable histograms are maximally distant.
pub fn histogram_distance(a: Option<&HsHistogram>, b: Option<&HsHistogram>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => match a.correlation(b) {
            Some(c) => (1.0 - c.clamp(0.0, 1.0)) as f32,
            None => 1.0,
        },
        _ => 1.0,
    }
}

/// 8-bit HSV: hue in `[0, 180)`, saturation and value in `[0, 255]`.
pub fn rgb_to_hsv8(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h8 = (h / 2.0).round() as u32 % 180;
    (h8 as u8, s.round() as u8, max as u8)
}

fn normalize_min_max(bins: &mut Array2<f32>, upper: f32) {
    let min = bins.iter().copied().fold(f32::INFINITY, f32::min);
    let max = bins.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    let scale = if range > f32::EPSILON { upper / range } else { 0.0 };
    bins.mapv_inplace(|v| (v - min) * scale);
}
