//! Integration module for connecting an external detector/tracker with the
//! tracking session.
//!
//! The external component reports, per frame, columnar ids, boxes, classes
//! and confidences. This module checks those columns once, turns them into
//! [`Detection`](crate::tracker::Detection)s and drives a
//! [`TrackingSession`](crate::tracker::TrackingSession).

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{FrameTracker, FrameTrackerOutput};
pub use pipeline::TrackingPipeline;
