//! Detection input and assignment utilities for identity re-association.

use ndarray::Array2;
use tracing::warn;

use crate::features::{HsHistogram, histogram_distance};
use crate::geometry::{Rect, iou_batch};
use crate::tracker::TrackId;

/// One detector output for one object in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Transient id assigned by the external tracker
    pub track_id: TrackId,
    /// Bounding box in pixel space
    pub bbox: Rect,
    pub class_name: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        track_id: TrackId,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        class_name: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            track_id,
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            class_name: class_name.into(),
            confidence,
        }
    }

    pub fn from_rect(
        track_id: TrackId,
        bbox: Rect,
        class_name: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            track_id,
            bbox,
            class_name: class_name.into(),
            confidence,
        }
    }

    /// Finite box with positive extent and a confidence within [0, 1].
    pub fn is_well_formed(&self) -> bool {
        self.bbox.is_valid() && self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Map boxes from detector resolution back to frame resolution.
pub fn scale_detections(detections: Vec<Detection>, inference_scale: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .map(|det| Detection {
            bbox: det.bbox.scaled_down(inference_scale),
            ..det
        })
        .collect()
}

/// Geometry and appearance of one side of a candidate pair.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub bbox: Rect,
    pub class_name: Option<&'a str>,
    pub histogram: Option<&'a HsHistogram>,
}

/// Re-association cost between lost tracks (rows) and new ids (columns).
///
/// Pairs of different or unknown class, and pairs whose IoU is below
/// `iou_threshold`, get an infinite cost. Others cost
/// `(1 - color_weight) * (1 - IoU) + color_weight * histogram_distance`.
pub fn reassociation_costs(
    lost: &[Candidate<'_>],
    new: &[Candidate<'_>],
    iou_threshold: f32,
    color_weight: f32,
) -> Array2<f32> {
    let lost_boxes: Vec<Rect> = lost.iter().map(|c| c.bbox).collect();
    let new_boxes: Vec<Rect> = new.iter().map(|c| c.bbox).collect();
    let ious = iou_batch(&lost_boxes, &new_boxes);

    let mut costs = Array2::from_elem((lost.len(), new.len()), f32::INFINITY);
    for (i, l) in lost.iter().enumerate() {
        let Some(lost_class) = l.class_name else {
            continue;
        };
        for (j, n) in new.iter().enumerate() {
            if n.class_name != Some(lost_class) {
                continue;
            }
            let iou = ious[[i, j]];
            if iou < iou_threshold {
                continue;
            }
            let appearance = histogram_distance(l.histogram, n.histogram);
            costs[[i, j]] = (1.0 - color_weight) * (1.0 - iou) + color_weight * appearance;
        }
    }
    costs
}

#[derive(Debug, Clone)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_cols: Vec<usize>,
}

/// Cost used in the padded square matrix for missing and forbidden edges.
const FORBIDDEN_COST: f64 = 1e6;

/// Minimum-cost rectangular assignment.
///
/// Infinite entries mark forbidden pairs; they are handed to the solver as a
/// large finite cost and dropped from the result afterwards. Returns `None`
/// when the matrix contains NaN or the solver fails.
pub fn linear_assignment(cost_matrix: &Array2<f32>) -> Option<AssignmentResult> {
    let (num_rows, num_cols) = cost_matrix.dim();

    if cost_matrix.iter().any(|c| c.is_nan()) {
        warn!("cost matrix contains NaN, skipping assignment");
        return None;
    }

    if num_rows == 0 || num_cols == 0 {
        return Some(AssignmentResult {
            matches: vec![],
            unmatched_rows: (0..num_rows).collect(),
            unmatched_cols: (0..num_cols).collect(),
        });
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), FORBIDDEN_COST);

    for i in 0..num_rows {
        for j in 0..num_cols {
            let c = cost_matrix[[i, j]];
            if c.is_finite() {
                padded[[i, j]] = c as f64;
            }
        }
    }

    let (row_to_col, _) = match lapjv::lapjv(&padded) {
        Ok(solution) => solution,
        Err(e) => {
            warn!(error = ?e, "assignment solver failed");
            return None;
        }
    };

    let mut matches = vec![];
    let mut unmatched_rows = vec![];
    let mut unmatched_cols_mask: Vec<bool> = vec![true; num_cols];

    for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
        if row_idx >= num_rows {
            continue;
        }
        if col_idx < num_cols && cost_matrix[[row_idx, col_idx]].is_finite() {
            matches.push((row_idx, col_idx));
            unmatched_cols_mask[col_idx] = false;
        } else {
            unmatched_rows.push(row_idx);
        }
    }

    let unmatched_cols: Vec<usize> = unmatched_cols_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    Some(AssignmentResult {
        matches,
        unmatched_rows,
        unmatched_cols,
    })
}
