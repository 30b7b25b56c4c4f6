use crate::features::HsHistogram;
use crate::geometry::Rect;
use crate::tracker::TrackId;
use crate::tracker::records::{AnnotationRecord, CsvRecord};

/// Everything known about one stable track.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub id: TrackId,
    pub bbox: Rect,
    /// Fixed at creation
    pub class_name: String,
    pub creation_frame: u64,
    pub last_seen_frame: u64,
    pub dominant_color: Option<[u8; 3]>,
    pub histogram: Option<HsHistogram>,
    /// Frame of the last dominant-colour refresh
    pub last_feature_update: Option<u64>,
    pub speed_kmh: Option<f64>,
    pub lane: Option<String>,
}

impl TrackedObject {
    pub fn new(id: TrackId, bbox: Rect, class_name: String, frame: u64) -> Self {
        Self {
            id,
            bbox,
            class_name,
            creation_frame: frame,
            last_seen_frame: frame,
            dominant_color: None,
            histogram: None,
            last_feature_update: None,
            speed_kmh: None,
            lane: None,
        }
    }

    pub fn observe(&mut self, bbox: Rect, frame: u64) {
        self.bbox = bbox;
        self.last_seen_frame = frame;
    }

    /// Whether the dominant colour is due for a refresh at `frame`.
    pub fn needs_color_refresh(&self, frame: u64, interval: u32) -> bool {
        self.last_feature_update
            .is_none_or(|last| frame.saturating_sub(last) >= u64::from(interval))
    }

    pub fn to_csv_record(&self, frame_id: u64, confidence: f32) -> CsvRecord {
        let [x1, y1, x2, y2] = self.bbox.to_tlbr();
        CsvRecord {
            frame_id,
            track_id: self.id,
            class_name: self.class_name.clone(),
            confidence,
            x1,
            y1,
            x2,
            y2,
            speed_kmh: self.speed_kmh,
            lane: self.lane.clone(),
            dominant_color: self.dominant_color,
        }
    }

    pub fn to_annotation(&self) -> AnnotationRecord {
        AnnotationRecord {
            track_id: self.id,
            class_name: self.class_name.clone(),
            bbox: self.bbox.to_tlbr(),
            speed_kmh: self.speed_kmh,
        }
    }
}
