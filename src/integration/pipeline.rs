//! TrackingPipeline for combining an external frame tracker with the
//! tracking session.

use std::collections::HashMap;

use image::RgbImage;
use tracing::warn;

use crate::calibration::Homography;
use crate::config::AppConfig;
use crate::features::HsHistogram;
use crate::tracker::{FrameOutput, TrackId, TrackingSession, scale_detections};

use super::FrameTracker;

/// Runs a `FrameTracker` and a `TrackingSession` frame by frame.
pub struct TrackingPipeline<T: FrameTracker> {
    tracker: T,
    session: TrackingSession,
    inference_scale: f32,
    histogram_bins: [usize; 2],
    frame_count: u64,
}

impl<T: FrameTracker> TrackingPipeline<T> {
    pub fn new(tracker: T, session: TrackingSession, config: &AppConfig) -> Self {
        Self {
            tracker,
            session,
            inference_scale: config.general.inference_scale,
            histogram_bins: config.color.histogram_bins,
            frame_count: 0,
        }
    }

    /// Build the session from configuration and a fitted homography.
    pub fn from_config(tracker: T, config: &AppConfig, homography: Homography) -> Self {
        let session = TrackingSession::from_config(config, homography);
        Self::new(tracker, session, config)
    }

    /// Process a single frame.
    ///
    /// Inconsistent tracker output is logged and the frame is processed with
    /// no detections, so lost-track bookkeeping keeps advancing.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<FrameOutput, T::Error> {
        self.frame_count += 1;
        let output = self.tracker.track(frame)?;

        let detections = match output.into_detections() {
            Ok(detections) => scale_detections(detections, self.inference_scale),
            Err(e) => {
                warn!(frame_count = self.frame_count, error = %e, "dropping frame detections");
                Vec::new()
            }
        };

        let histograms: HashMap<TrackId, HsHistogram> = detections
            .iter()
            .filter_map(|det| {
                HsHistogram::from_region(frame, &det.bbox, self.histogram_bins)
                    .map(|h| (det.track_id, h))
            })
            .collect();

        Ok(self
            .session
            .process_frame(self.frame_count, &detections, Some(frame), &histograms))
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get a reference to the underlying frame tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Get a mutable reference to the underlying frame tracker.
    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut TrackingSession {
        &mut self.session
    }

    /// Tear down all tracks at the end of a run.
    pub fn finish(&mut self) {
        self.session.cleanup_all_tracking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PixelPoint, Polygon};
    use crate::integration::FrameTrackerOutput;
    use image::Rgb;

    struct ScriptedTracker {
        frames: Vec<FrameTrackerOutput>,
        next: usize,
    }

    impl FrameTracker for ScriptedTracker {
        type Error = std::convert::Infallible;

        fn track(&mut self, _frame: &RgbImage) -> Result<FrameTrackerOutput, Self::Error> {
            let out = self.frames.get(self.next).cloned().unwrap_or_default();
            self.next += 1;
            Ok(out)
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.geometry.validation_zone = Polygon::new(vec![
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(320.0, 0.0),
            PixelPoint::new(320.0, 240.0),
            PixelPoint::new(0.0, 240.0),
        ]);
        config.general.inference_scale = 2.0;
        config.color.histogram_bins = [30, 32];
        config
    }

    fn single(id: TrackId, bbox: [f32; 4]) -> FrameTrackerOutput {
        FrameTrackerOutput {
            ids: vec![id],
            boxes: vec![bbox],
            classes: vec!["car".into()],
            confidences: vec![0.8],
        }
    }

    #[test]
    fn test_pipeline_scales_and_tracks() {
        let tracker = ScriptedTracker {
            frames: vec![single(4, [40.0, 40.0, 120.0, 120.0])],
            next: 0,
        };
        let mut pipeline = TrackingPipeline::from_config(tracker, &config(), Homography::identity());
        let frame = RgbImage::from_pixel(320, 240, Rgb([180, 40, 40]));

        let out = pipeline.process_frame(&frame).unwrap();
        assert_eq!(out.csv_records.len(), 1);
        let rec = &out.csv_records[0];
        assert_eq!([rec.x1, rec.y1, rec.x2, rec.y2], [20.0, 20.0, 60.0, 60.0]);
        assert_eq!(rec.dominant_color, Some([180, 40, 40]));

        let obj = &pipeline.session().tracked_objects()[&4];
        assert!(obj.histogram.is_some());
    }

    #[test]
    fn test_inconsistent_frame_is_skipped() {
        let mut broken = single(4, [40.0, 40.0, 120.0, 120.0]);
        broken.confidences.clear();
        let tracker = ScriptedTracker {
            frames: vec![single(4, [40.0, 40.0, 120.0, 120.0]), broken],
            next: 0,
        };
        let mut pipeline = TrackingPipeline::from_config(tracker, &config(), Homography::identity());
        let frame = RgbImage::new(320, 240);

        pipeline.process_frame(&frame).unwrap();
        let out = pipeline.process_frame(&frame).unwrap();
        assert!(out.csv_records.is_empty());
        assert_eq!(pipeline.frame_count(), 2);
        assert!(pipeline.session().manager().lost_tracks().contains_key(&4));
    }
}
