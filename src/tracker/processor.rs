//! Per-track enrichment: lane, appearance and speed.

use image::RgbImage;
use tracing::debug;

use crate::config::ColorConfig;
use crate::features::{FeatureExtractor, HsHistogram};
use crate::geometry::{NamedPolygon, first_containing};
use crate::tracker::speed::SpeedCalculator;
use crate::tracker::tracked_object::TrackedObject;

/// Per-frame enrichment of a tracked object inside the validation zone.
#[derive(Debug, Clone)]
pub struct TrackProcessor {
    lanes: Vec<NamedPolygon>,
    features: FeatureExtractor,
    recalculation_interval: u32,
}

impl TrackProcessor {
    pub fn new(lanes: Vec<NamedPolygon>, color: &ColorConfig) -> Self {
        Self {
            lanes,
            features: FeatureExtractor::new(color),
            recalculation_interval: color.recalculation_interval,
        }
    }

    pub fn features_mut(&mut self) -> &mut FeatureExtractor {
        &mut self.features
    }

    /// Assign the lane, take over the latest histogram, refresh the dominant
    /// colour when due and read the current speed.
    pub fn process_track(
        &mut self,
        obj: &mut TrackedObject,
        frame: Option<&RgbImage>,
        frame_count: u64,
        histogram: Option<&HsHistogram>,
        speed: Option<&SpeedCalculator>,
    ) {
        obj.lane = first_containing(&self.lanes, &obj.bbox.center()).map(str::to_string);

        if let Some(hist) = histogram {
            obj.histogram = Some(hist.clone());
        }

        if let Some(frame) = frame {
            if obj.needs_color_refresh(frame_count, self.recalculation_interval) {
                match self.features.dominant_color(frame, &obj.bbox) {
                    Some(color) => {
                        obj.dominant_color = Some(color);
                        debug!(track_id = obj.id, ?color, "dominant colour refreshed");
                    }
                    None => debug!(track_id = obj.id, "dominant colour unavailable, keeping previous"),
                }
                obj.last_feature_update = Some(frame_count);
            }
        }

        obj.speed_kmh = speed.and_then(|s| s.get_speed(obj.id));
    }
}
