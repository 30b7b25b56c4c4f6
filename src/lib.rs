//! Stable object tracks with calibrated speed estimates.
//!
//! The crate sits behind an external detector/tracker that produces per-frame
//! detections with short-lived ids. It repairs broken ids by re-associating
//! reappearing objects with recently lost ones, estimates real-world speed
//! through a perspective calibration and a per-track Kalman filter, and keeps
//! a slowly refreshed appearance signature for every track.

pub mod calibration;
pub mod config;
pub mod error;
pub mod features;
pub mod geometry;
pub mod integration;
pub mod tracker;

pub use calibration::{Calibration, CalibrationMesh, Homography, PerspectiveCalibrator};
pub use config::AppConfig;
pub use error::{Result, TrackError};
pub use geometry::{PixelPoint, Polygon, Rect, WorldPoint};
pub use integration::{DetectionBuilder, FrameTracker, FrameTrackerOutput, TrackingPipeline};
pub use tracker::{
    AnnotationRecord, CsvRecord, Detection, FrameOutput, SpeedCalculator, TrackedObject,
    TrackingManager, TrackingSession,
};
