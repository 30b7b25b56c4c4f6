//! Output records for CSV export and annotation.

use serde::Serialize;

use crate::tracker::TrackId;

/// One output row per processed object per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRecord {
    pub frame_id: u64,
    pub track_id: TrackId,
    pub class_name: String,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub speed_kmh: Option<f64>,
    pub lane: Option<String>,
    pub dominant_color: Option<[u8; 3]>,
}

impl CsvRecord {
    pub const HEADER: [&'static str; 11] = [
        "frame_id",
        "track_id",
        "class_name",
        "confidence",
        "x1",
        "y1",
        "x2",
        "y2",
        "speed_kmh",
        "lane",
        "dominant_color",
    ];

    pub fn header(separator: &str) -> String {
        Self::HEADER.join(separator)
    }

    /// Delimited text row. Missing optional values are empty fields.
    pub fn to_row(&self, separator: &str) -> String {
        let fields = [
            self.frame_id.to_string(),
            self.track_id.to_string(),
            self.class_name.clone(),
            format!("{:.4}", self.confidence),
            format!("{:.2}", self.x1),
            format!("{:.2}", self.y1),
            format!("{:.2}", self.x2),
            format!("{:.2}", self.y2),
            self.speed_kmh.map(|s| format!("{s:.2}")).unwrap_or_default(),
            self.lane.clone().unwrap_or_default(),
            self.dominant_color
                .map(|[r, g, b]| format!("({r} {g} {b})"))
                .unwrap_or_default(),
        ];
        fields.join(separator)
    }
}

/// Overlay data for drawing one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRecord {
    pub track_id: TrackId,
    pub class_name: String,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    pub speed_kmh: Option<f64>,
}

impl AnnotationRecord {
    pub fn label(&self) -> String {
        match self.speed_kmh {
            Some(speed) => format!("{} {} {:.1} km/h", self.track_id, self.class_name, speed),
            None => format!("{} {}", self.track_id, self.class_name),
        }
    }
}
