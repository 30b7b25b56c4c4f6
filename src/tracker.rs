mod kalman_filter;
mod lifecycle;
mod matching;
mod processor;
mod records;
mod session;
mod speed;
mod tracked_object;
mod tracking_manager;

/// Identifier of a track, transient (as issued by the detector) or stable.
pub type TrackId = u64;

pub use kalman_filter::KalmanFilter;
pub use lifecycle::{FrameOutput, TrackLifecycleManager};
pub use matching::{
    AssignmentResult, Candidate, Detection, linear_assignment, reassociation_costs,
    scale_detections,
};
pub use processor::TrackProcessor;
pub use records::{AnnotationRecord, CsvRecord};
pub use session::TrackingSession;
pub use speed::{MIN_UPDATES_FOR_SPEED, SpeedCalculator};
pub use tracked_object::TrackedObject;
pub use tracking_manager::{FrameObservation, LostTrackRecord, TrackingManager};
