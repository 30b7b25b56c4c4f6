//! Per-frame lifecycle of stable tracks: creation, update, zone gating and teardown.

use std::collections::{BTreeMap, HashMap};

use image::RgbImage;
use tracing::debug;

use crate::features::HsHistogram;
use crate::geometry::Polygon;
use crate::tracker::TrackId;
use crate::tracker::matching::Detection;
use crate::tracker::processor::TrackProcessor;
use crate::tracker::records::{AnnotationRecord, CsvRecord};
use crate::tracker::speed::SpeedCalculator;
use crate::tracker::tracked_object::TrackedObject;
use crate::tracker::tracking_manager::TrackingManager;

/// Records produced for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub csv_records: Vec<CsvRecord>,
    pub annotations: Vec<AnnotationRecord>,
}

/// Creates, updates and tears down tracked objects.
#[derive(Debug, Clone)]
pub struct TrackLifecycleManager {
    validation_zone: Polygon,
    speed: Option<SpeedCalculator>,
    /// Present only while the validation zone is enabled
    processor: Option<TrackProcessor>,
    tracked_objects: BTreeMap<TrackId, TrackedObject>,
}

impl TrackLifecycleManager {
    pub fn new(
        validation_zone: Polygon,
        speed: Option<SpeedCalculator>,
        processor: Option<TrackProcessor>,
    ) -> Self {
        Self {
            validation_zone,
            speed,
            processor,
            tracked_objects: BTreeMap::new(),
        }
    }

    pub fn tracked_objects(&self) -> &BTreeMap<TrackId, TrackedObject> {
        &self.tracked_objects
    }

    pub fn speed_calculator(&self) -> Option<&SpeedCalculator> {
        self.speed.as_ref()
    }

    pub fn processor_mut(&mut self) -> Option<&mut TrackProcessor> {
        self.processor.as_mut()
    }

    fn in_validation_zone(&self, obj: &TrackedObject) -> bool {
        self.processor.is_some() && self.validation_zone.contains(&obj.bbox.center())
    }

    /// Update every object seen in this frame and emit records for the ones
    /// inside the validation zone.
    ///
    /// `histograms` is keyed by transient detector id.
    pub fn process_all_tracks(
        &mut self,
        manager: &mut TrackingManager,
        detections: &[Detection],
        frame: Option<&RgbImage>,
        frame_count: u64,
        histograms: &HashMap<TrackId, HsHistogram>,
    ) -> FrameOutput {
        let mut output = FrameOutput::default();

        for (final_id, det) in manager.resolve_detection_collisions(detections) {
            let class_name = manager.get_or_set_class(final_id, &det.class_name);
            let obj = self
                .tracked_objects
                .entry(final_id)
                .or_insert_with(|| TrackedObject::new(final_id, det.bbox, class_name, frame_count));
            obj.observe(det.bbox, frame_count);

            if let Some(speed) = self.speed.as_mut() {
                speed.update_position(final_id, det.bbox.ground_contact());
            }

            match self.processor.as_mut() {
                Some(processor) if self.validation_zone.contains(&obj.bbox.center()) => {
                    processor.process_track(
                        obj,
                        frame,
                        frame_count,
                        histograms.get(&det.track_id),
                        self.speed.as_ref(),
                    );
                    output
                        .csv_records
                        .push(obj.to_csv_record(frame_count, det.confidence));
                    output.annotations.push(obj.to_annotation());
                }
                _ => obj.speed_kmh = None,
            }
        }

        output
    }

    /// Tear down objects absent for more than `max_frames_lost` frames.
    pub fn clear_stale_objects(
        &mut self,
        manager: &mut TrackingManager,
        frame_count: u64,
        current_detections: &[Detection],
    ) {
        for id in manager.stale_track_ids(current_detections, &self.tracked_objects, frame_count) {
            if let Some(obj) = self.tracked_objects.remove(&id) {
                debug!(
                    track_id = id,
                    last_seen = obj.last_seen_frame,
                    frame_count,
                    "stale track removed"
                );
            }
            if let Some(speed) = self.speed.as_mut() {
                speed.remove_filter(id);
            }
            manager.forget(id);
        }
    }

    /// Drop every tracked object and filter.
    pub fn cleanup_all_tracking(&mut self) {
        debug!(count = self.tracked_objects.len(), "tearing down all tracks");
        self.tracked_objects.clear();
        if let Some(speed) = self.speed.as_mut() {
            speed.clear();
        }
    }

    pub fn is_tracked(&self, id: TrackId) -> bool {
        self.tracked_objects.contains_key(&id)
    }

    pub fn is_in_zone(&self, id: TrackId) -> bool {
        self.tracked_objects
            .get(&id)
            .is_some_and(|obj| self.in_validation_zone(obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Homography;
    use crate::config::{CalculationConfig, ColorConfig, TrackingConfig};
    use crate::geometry::PixelPoint;

    fn zone() -> Polygon {
        Polygon::new(vec![
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(300.0, 0.0),
            PixelPoint::new(300.0, 300.0),
            PixelPoint::new(0.0, 300.0),
        ])
    }

    fn lifecycle(zone_enabled: bool) -> (TrackLifecycleManager, TrackingManager) {
        let tracking = TrackingConfig {
            max_frames_lost: 2,
            ..TrackingConfig::default()
        };
        let calculation = CalculationConfig {
            units_per_meter: 1.0,
            ..CalculationConfig::default()
        };
        let speed = SpeedCalculator::new(Homography::identity(), &tracking, &calculation);
        let processor = zone_enabled.then(|| TrackProcessor::new(vec![], &ColorConfig::default()));
        (
            TrackLifecycleManager::new(zone(), Some(speed), processor),
            TrackingManager::from_config(&tracking),
        )
    }

    #[test]
    fn test_inside_zone_emits_records() {
        let (mut lc, mut tm) = lifecycle(true);
        let dets = [Detection::new(3, 10.0, 10.0, 50.0, 50.0, "car", 0.9)];
        let out = lc.process_all_tracks(&mut tm, &dets, None, 1, &HashMap::new());
        assert_eq!(out.csv_records.len(), 1);
        assert_eq!(out.annotations.len(), 1);
        assert_eq!(out.csv_records[0].track_id, 3);
        assert!(lc.is_in_zone(3));
    }

    #[test]
    fn test_outside_zone_clears_speed() {
        let (mut lc, mut tm) = lifecycle(true);
        for f in 1..=4 {
            let x = f as f32;
            let dets = [Detection::new(3, 10.0 + x, 10.0, 50.0 + x, 50.0, "car", 0.9)];
            lc.process_all_tracks(&mut tm, &dets, None, f, &HashMap::new());
        }
        assert!(lc.tracked_objects()[&3].speed_kmh.is_some());

        let dets = [Detection::new(3, 400.0, 10.0, 450.0, 50.0, "car", 0.9)];
        let out = lc.process_all_tracks(&mut tm, &dets, None, 5, &HashMap::new());
        assert!(out.csv_records.is_empty());
        assert_eq!(lc.tracked_objects()[&3].speed_kmh, None);
        assert_eq!(lc.speed_calculator().unwrap().update_count(3), 5);
    }

    #[test]
    fn test_disabled_zone_emits_nothing() {
        let (mut lc, mut tm) = lifecycle(false);
        let dets = [Detection::new(3, 10.0, 10.0, 50.0, 50.0, "car", 0.9)];
        let out = lc.process_all_tracks(&mut tm, &dets, None, 1, &HashMap::new());
        assert_eq!(out, FrameOutput::default());
        assert!(lc.is_tracked(3));
        assert!(!lc.is_in_zone(3));
    }

    #[test]
    fn test_class_fixed_at_creation() {
        let (mut lc, mut tm) = lifecycle(true);
        let first = [Detection::new(3, 10.0, 10.0, 50.0, 50.0, "car", 0.9)];
        lc.process_all_tracks(&mut tm, &first, None, 1, &HashMap::new());
        let second = [Detection::new(3, 10.0, 10.0, 50.0, 50.0, "truck", 0.9)];
        let out = lc.process_all_tracks(&mut tm, &second, None, 2, &HashMap::new());
        assert_eq!(out.csv_records[0].class_name, "car");
    }

    #[test]
    fn test_stale_objects_are_torn_down() {
        let (mut lc, mut tm) = lifecycle(true);
        let dets = [Detection::new(3, 10.0, 10.0, 50.0, 50.0, "car", 0.9)];
        lc.process_all_tracks(&mut tm, &dets, None, 1, &HashMap::new());

        lc.clear_stale_objects(&mut tm, 3, &[]);
        assert!(lc.is_tracked(3));

        lc.clear_stale_objects(&mut tm, 4, &[]);
        assert!(!lc.is_tracked(3));
        assert_eq!(lc.speed_calculator().unwrap().update_count(3), 0);
    }

    #[test]
    fn test_cleanup_all() {
        let (mut lc, mut tm) = lifecycle(true);
        let dets = [
            Detection::new(1, 10.0, 10.0, 50.0, 50.0, "car", 0.9),
            Detection::new(2, 100.0, 10.0, 150.0, 50.0, "car", 0.9),
        ];
        lc.process_all_tracks(&mut tm, &dets, None, 1, &HashMap::new());
        lc.cleanup_all_tracking();
        assert!(lc.tracked_objects().is_empty());
        assert_eq!(lc.speed_calculator().unwrap().update_count(1), 0);
    }
}
