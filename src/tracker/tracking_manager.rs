//! Identity persistence across detector id breaks.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::config::TrackingConfig;
use crate::features::HsHistogram;
use crate::geometry::Rect;
use crate::tracker::TrackId;
use crate::tracker::matching::{self, Candidate, Detection};
use crate::tracker::tracked_object::TrackedObject;

/// What the tracking manager needs to know about one transient id in the
/// current frame.
#[derive(Debug, Clone)]
pub struct FrameObservation {
    pub bbox: Rect,
    pub class_name: String,
    pub histogram: Option<HsHistogram>,
}

/// Snapshot of a stable track at the moment it disappeared.
#[derive(Debug, Clone)]
pub struct LostTrackRecord {
    pub bbox: Rect,
    pub histogram: Option<HsHistogram>,
    pub class_name: Option<String>,
    pub lost_frame: u64,
}

/// Maps transient detector ids to stable track ids.
///
/// When the external tracker drops an id and starts a new one for the same
/// object, the new id is linked back to the lost stable id by a class-gated
/// IoU + appearance assignment.
#[derive(Debug, Clone)]
pub struct TrackingManager {
    id_map: HashMap<TrackId, TrackId>,
    class_map: HashMap<TrackId, String>,
    histogram_map: HashMap<TrackId, HsHistogram>,
    lost_tracks: BTreeMap<TrackId, LostTrackRecord>,
    previous_tracks: BTreeMap<TrackId, Rect>,

    max_frames_lost: u32,
    iou_threshold: f32,
    color_weight: f32,
}

impl TrackingManager {
    pub fn new(max_frames_lost: u32, iou_threshold: f32, color_weight: f32) -> Self {
        Self {
            id_map: HashMap::new(),
            class_map: HashMap::new(),
            histogram_map: HashMap::new(),
            lost_tracks: BTreeMap::new(),
            previous_tracks: BTreeMap::new(),
            max_frames_lost,
            iou_threshold,
            color_weight,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(
            config.max_frames_lost,
            config.iou_threshold,
            config.color_weight,
        )
    }

    pub fn max_frames_lost(&self) -> u32 {
        self.max_frames_lost
    }

    /// Stable id for a transient id. Unmapped ids are their own stable id.
    pub fn final_id(&self, transient_id: TrackId) -> TrackId {
        self.id_map.get(&transient_id).copied().unwrap_or(transient_id)
    }

    pub fn lost_tracks(&self) -> &BTreeMap<TrackId, LostTrackRecord> {
        &self.lost_tracks
    }

    pub fn histogram(&self, stable_id: TrackId) -> Option<&HsHistogram> {
        self.histogram_map.get(&stable_id)
    }

    /// Advance the id bookkeeping by one frame.
    pub fn update_tracks(
        &mut self,
        current_tracks: &BTreeMap<TrackId, FrameObservation>,
        frame_count: u64,
    ) {
        let previous_ids: BTreeSet<TrackId> = self.previous_tracks.keys().copied().collect();
        let current_ids: BTreeSet<TrackId> = current_tracks.keys().copied().collect();

        // New ids are stored after re-association, under whatever they resolve to.
        for (tid, obs) in current_tracks {
            if !previous_ids.contains(tid) {
                continue;
            }
            if let Some(hist) = &obs.histogram {
                self.histogram_map.insert(self.final_id(*tid), hist.clone());
            }
        }

        let live: BTreeSet<TrackId> = current_ids.iter().map(|&t| self.final_id(t)).collect();

        self.handle_lost_tracks(&previous_ids, &current_ids, &live, frame_count);

        // A stable id that is visible again needs no re-association.
        self.lost_tracks.retain(|stable_id, _| !live.contains(stable_id));

        let new_ids: Vec<TrackId> = current_ids.difference(&previous_ids).copied().collect();
        if !new_ids.is_empty() && !self.lost_tracks.is_empty() {
            self.reassociate_tracks(&new_ids, current_tracks, frame_count);
        }

        self.cleanup_old_lost_tracks(frame_count);

        for (&tid, obs) in current_tracks {
            let stable_id = self.final_id(tid);
            if !previous_ids.contains(&tid) {
                if let Some(hist) = &obs.histogram {
                    self.histogram_map.insert(stable_id, hist.clone());
                }
            }
            self.class_map
                .entry(stable_id)
                .or_insert_with(|| obs.class_name.clone());
        }

        self.previous_tracks = current_tracks
            .iter()
            .map(|(&tid, obs)| (tid, obs.bbox))
            .collect();
    }

    fn handle_lost_tracks(
        &mut self,
        previous_ids: &BTreeSet<TrackId>,
        current_ids: &BTreeSet<TrackId>,
        live: &BTreeSet<TrackId>,
        frame_count: u64,
    ) {
        for &lost_id in previous_ids.difference(current_ids) {
            let stable_id = self.final_id(lost_id);
            if live.contains(&stable_id) || self.lost_tracks.contains_key(&stable_id) {
                continue;
            }
            let Some(&bbox) = self.previous_tracks.get(&lost_id) else {
                continue;
            };
            debug!(transient_id = lost_id, stable_id, frame_count, "track lost");
            self.lost_tracks.insert(
                stable_id,
                LostTrackRecord {
                    bbox,
                    histogram: self.histogram_map.get(&stable_id).cloned(),
                    class_name: self.class_map.get(&stable_id).cloned(),
                    lost_frame: frame_count,
                },
            );
        }
    }

    fn is_expired(&self, record: &LostTrackRecord, frame_count: u64) -> bool {
        frame_count.saturating_sub(record.lost_frame) > u64::from(self.max_frames_lost)
    }

    fn reassociate_tracks(
        &mut self,
        new_ids: &[TrackId],
        current_tracks: &BTreeMap<TrackId, FrameObservation>,
        frame_count: u64,
    ) {
        let lost_ids: Vec<TrackId> = self
            .lost_tracks
            .iter()
            .filter(|(_, record)| !self.is_expired(record, frame_count))
            .map(|(&id, _)| id)
            .collect();
        if lost_ids.is_empty() {
            return;
        }

        let lost: Vec<Candidate<'_>> = lost_ids
            .iter()
            .map(|id| {
                let record = &self.lost_tracks[id];
                Candidate {
                    bbox: record.bbox,
                    class_name: record.class_name.as_deref(),
                    histogram: record.histogram.as_ref(),
                }
            })
            .collect();
        let new: Vec<Candidate<'_>> = new_ids
            .iter()
            .map(|id| {
                let obs = &current_tracks[id];
                Candidate {
                    bbox: obs.bbox,
                    class_name: Some(obs.class_name.as_str()),
                    histogram: obs.histogram.as_ref(),
                }
            })
            .collect();

        let costs =
            matching::reassociation_costs(&lost, &new, self.iou_threshold, self.color_weight);
        if !costs.iter().any(|c| c.is_finite()) {
            return;
        }

        let Some(assignment) = matching::linear_assignment(&costs) else {
            warn!(frame_count, "re-association skipped for this frame");
            return;
        };

        for (row, col) in assignment.matches {
            let stable_id = lost_ids[row];
            let new_id = new_ids[col];
            debug!(
                stable_id,
                new_id,
                cost = costs[[row, col]],
                "re-associated new id with lost track"
            );
            if current_tracks[&new_id].histogram.is_some()
                && self.histogram_map.contains_key(&stable_id)
            {
                warn!(stable_id, new_id, "replacing appearance memory with newer histogram");
            }
            self.id_map.insert(new_id, stable_id);
            self.lost_tracks.remove(&stable_id);
        }
    }

    fn cleanup_old_lost_tracks(&mut self, frame_count: u64) {
        let expired: Vec<TrackId> = self
            .lost_tracks
            .iter()
            .filter(|(_, record)| self.is_expired(record, frame_count))
            .map(|(&id, _)| id)
            .collect();
        for id in expired {
            debug!(stable_id = id, frame_count, "lost track retired");
            self.lost_tracks.remove(&id);
        }
    }

    /// Class of a stable id, fixed by its first observation.
    pub fn get_or_set_class(&mut self, stable_id: TrackId, class_name: &str) -> String {
        self.class_map
            .entry(stable_id)
            .or_insert_with(|| class_name.to_string())
            .clone()
    }

    /// Drop the class and appearance memory of a torn-down stable id.
    pub fn forget(&mut self, stable_id: TrackId) {
        self.class_map.remove(&stable_id);
        self.histogram_map.remove(&stable_id);
    }

    /// Stable ids that have been absent from the current frame for more than
    /// `max_frames_lost` frames.
    pub fn stale_track_ids(
        &self,
        current_detections: &[Detection],
        tracked_objects: &BTreeMap<TrackId, TrackedObject>,
        frame_count: u64,
    ) -> Vec<TrackId> {
        let current_final_ids: BTreeSet<TrackId> = current_detections
            .iter()
            .map(|det| self.final_id(det.track_id))
            .collect();

        tracked_objects
            .iter()
            .filter(|(id, _)| !current_final_ids.contains(id))
            .filter(|(_, obj)| {
                frame_count.saturating_sub(obj.last_seen_frame) > u64::from(self.max_frames_lost)
            })
            .map(|(&id, _)| id)
            .collect()
    }

    /// One detection per stable id; the most confident one wins.
    pub fn resolve_detection_collisions(
        &self,
        detections: &[Detection],
    ) -> BTreeMap<TrackId, Detection> {
        let mut final_map: BTreeMap<TrackId, Detection> = BTreeMap::new();
        for det in detections {
            let final_id = self.final_id(det.track_id);
            match final_map.get(&final_id) {
                Some(existing) if existing.confidence >= det.confidence => {}
                _ => {
                    final_map.insert(final_id, det.clone());
                }
            }
        }
        final_map
    }

    pub fn reset(&mut self) {
        self.id_map.clear();
        self.class_map.clear();
        self.histogram_map.clear();
        self.lost_tracks.clear();
        self.previous_tracks.clear();
    }
}
