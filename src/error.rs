//! Error types for calibration, configuration and detector input.

use thiserror::Error;

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Errors that can occur while calibrating or feeding the tracker.
#[derive(Error, Debug)]
pub enum TrackError {
    /// Two trapezoid edges that must meet at a vanishing point are parallel.
    #[error("degenerate calibration geometry: {edge} edges are parallel")]
    DegenerateGeometry { edge: &'static str },

    #[error("homography fit failed: {0}")]
    CalibrationFailure(String),

    /// Detector output could not be turned into detections.
    #[error("inconsistent detector output: {0}")]
    InputDataInconsistency(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl TrackError {
    pub fn calibration<S: Into<String>>(msg: S) -> Self {
        Self::CalibrationFailure(msg.into())
    }

    pub fn inconsistent<S: Into<String>>(msg: S) -> Self {
        Self::InputDataInconsistency(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
