//! One tracking run: identity bookkeeping and track lifecycle behind a single owner.

use std::collections::{BTreeMap, HashMap};

use image::RgbImage;
use tracing::warn;

use crate::calibration::Homography;
use crate::config::AppConfig;
use crate::features::HsHistogram;
use crate::tracker::TrackId;
use crate::tracker::lifecycle::{FrameOutput, TrackLifecycleManager};
use crate::tracker::matching::Detection;
use crate::tracker::processor::TrackProcessor;
use crate::tracker::speed::SpeedCalculator;
use crate::tracker::tracked_object::TrackedObject;
use crate::tracker::tracking_manager::{FrameObservation, TrackingManager};

/// All per-track state of one video stream.
///
/// Each frame runs identity re-association, then per-object processing,
/// then stale-track teardown.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    manager: TrackingManager,
    lifecycle: TrackLifecycleManager,
}

impl TrackingSession {
    pub fn new(manager: TrackingManager, lifecycle: TrackLifecycleManager) -> Self {
        Self { manager, lifecycle }
    }

    /// Build a session from configuration and a fitted ground-plane
    /// homography.
    pub fn from_config(config: &AppConfig, homography: Homography) -> Self {
        let manager = TrackingManager::from_config(&config.tracking);

        let speed = config
            .general
            .enable_speed
            .then(|| SpeedCalculator::new(homography, &config.tracking, &config.calculation));

        let mut processor = config
            .general
            .enable_validation_zone
            .then(|| TrackProcessor::new(config.geometry.lanes.clone(), &config.color));
        if config.geometry.validation_zone.is_empty() {
            processor = None;
        }

        let lifecycle = TrackLifecycleManager::new(
            config.geometry.validation_zone.clone(),
            speed,
            processor,
        );
        Self::new(manager, lifecycle)
    }

    pub fn manager(&self) -> &TrackingManager {
        &self.manager
    }

    pub fn lifecycle(&self) -> &TrackLifecycleManager {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut TrackLifecycleManager {
        &mut self.lifecycle
    }

    pub fn tracked_objects(&self) -> &BTreeMap<TrackId, TrackedObject> {
        self.lifecycle.tracked_objects()
    }

    /// Stable id currently assigned to a transient detector id.
    pub fn final_id(&self, transient_id: TrackId) -> TrackId {
        self.manager.final_id(transient_id)
    }

    /// Run one frame.
    ///
    /// `histograms` holds appearance histograms keyed by transient id; it may
    /// be empty. Malformed detections are dropped with a warning.
    pub fn process_frame(
        &mut self,
        frame_count: u64,
        detections: &[Detection],
        frame: Option<&RgbImage>,
        histograms: &HashMap<TrackId, HsHistogram>,
    ) -> FrameOutput {
        let detections: Vec<Detection> = detections
            .iter()
            .filter(|det| {
                let ok = det.is_well_formed();
                if !ok {
                    warn!(
                        track_id = det.track_id,
                        bbox = ?det.bbox.to_tlbr(),
                        confidence = det.confidence,
                        "dropping malformed detection"
                    );
                }
                ok
            })
            .cloned()
            .collect();

        let current_tracks: BTreeMap<TrackId, FrameObservation> = detections
            .iter()
            .map(|det| {
                (
                    det.track_id,
                    FrameObservation {
                        bbox: det.bbox,
                        class_name: det.class_name.clone(),
                        histogram: histograms.get(&det.track_id).cloned(),
                    },
                )
            })
            .collect();

        self.manager.update_tracks(&current_tracks, frame_count);
        let output = self.lifecycle.process_all_tracks(
            &mut self.manager,
            &detections,
            frame,
            frame_count,
            histograms,
        );
        self.lifecycle
            .clear_stale_objects(&mut self.manager, frame_count, &detections);
        output
    }

    /// Tear down every object and filter at the end of a run.
    pub fn cleanup_all_tracking(&mut self) {
        self.lifecycle.cleanup_all_tracking();
    }

    /// Forget everything, including id mappings and lost tracks.
    pub fn reset(&mut self) {
        self.lifecycle.cleanup_all_tracking();
        self.manager.reset();
    }
}
