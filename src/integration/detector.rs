//! Capability contract for the external detector/tracker.

use image::RgbImage;
use tracing::warn;

use crate::error::{Result, TrackError};
use crate::tracker::{Detection, TrackId};

/// Columnar per-frame output of an external detector/tracker.
///
/// All four columns describe the same detections in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTrackerOutput {
    pub ids: Vec<TrackId>,
    /// `[x1, y1, x2, y2]` per detection
    pub boxes: Vec<[f32; 4]>,
    pub classes: Vec<String>,
    pub confidences: Vec<f32>,
}

impl FrameTrackerOutput {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check the columns and zip them into detections.
    ///
    /// Columns of different lengths are an error for the whole frame.
    /// Individual rows with a malformed box or confidence are skipped.
    pub fn into_detections(self) -> Result<Vec<Detection>> {
        let n = self.ids.len();
        if self.boxes.len() != n || self.classes.len() != n || self.confidences.len() != n {
            return Err(TrackError::inconsistent(format!(
                "column lengths differ: ids={}, boxes={}, classes={}, confidences={}",
                n,
                self.boxes.len(),
                self.classes.len(),
                self.confidences.len()
            )));
        }

        let detections = self
            .ids
            .into_iter()
            .zip(self.boxes)
            .zip(self.classes)
            .zip(self.confidences)
            .filter_map(|(((id, [x1, y1, x2, y2]), class_name), confidence)| {
                let det = Detection::new(id, x1, y1, x2, y2, class_name, confidence);
                if det.is_well_formed() {
                    Some(det)
                } else {
                    warn!(
                        track_id = id,
                        bbox = ?[x1, y1, x2, y2],
                        confidence,
                        "skipping malformed detection"
                    );
                    None
                }
            })
            .collect();
        Ok(detections)
    }
}

/// External detector + short-term tracker.
///
/// Implement this trait to feed any detection model into the pipeline. Ids
/// only need to be stable for as long as the external tracker can follow an
/// object; breaks are repaired downstream.
///
/// # Example
///
/// ```ignore
/// use speedtrack_rs::{FrameTracker, FrameTrackerOutput};
///
/// struct MyTracker {
///     // Your model here
/// }
///
/// impl FrameTracker for MyTracker {
///     type Error = std::io::Error;
///
///     fn track(&mut self, frame: &image::RgbImage) -> Result<FrameTrackerOutput, Self::Error> {
///         Ok(FrameTrackerOutput::default())
///     }
/// }
/// ```
pub trait FrameTracker {
    /// Error type for inference failures.
    type Error;

    /// Run detection and short-term tracking on one frame.
    fn track(&mut self, frame: &RgbImage) -> std::result::Result<FrameTrackerOutput, Self::Error>;
}
