//! Projective mesh generation from a single ground-plane trapezoid.

use tracing::{debug, info};

use crate::calibration::CalibrationMesh;
use crate::error::{Result, TrackError};
use crate::geometry::{PixelPoint, line_intersection};

/// Derives a perspective-correct lattice from four pixel corners of a
/// rectangular ground region.
///
/// The lateral edges (left and right) meet at the lateral vanishing point,
/// the top and bottom edges at the horizontal one. Both must exist.
#[derive(Debug, Clone)]
pub struct PerspectiveCalibrator {
    top_left: PixelPoint,
    top_right: PixelPoint,
    bottom_right: PixelPoint,
    bottom_left: PixelPoint,
    lateral_vp: PixelPoint,
    horizontal_vp: PixelPoint,
}

impl PerspectiveCalibrator {
    /// `region` is top-left, top-right, bottom-right, bottom-left.
    pub fn new(region: [PixelPoint; 4]) -> Result<Self> {
        let [top_left, top_right, bottom_right, bottom_left] = region;

        let lateral_vp = line_intersection(&bottom_left, &top_left, &bottom_right, &top_right)
            .ok_or(TrackError::DegenerateGeometry { edge: "lateral" })?;
        let horizontal_vp = line_intersection(&top_left, &top_right, &bottom_left, &bottom_right)
            .ok_or(TrackError::DegenerateGeometry { edge: "horizontal" })?;

        info!(
            lateral_x = lateral_vp.x,
            lateral_y = lateral_vp.y,
            horizontal_x = horizontal_vp.x,
            horizontal_y = horizontal_vp.y,
            "vanishing points computed"
        );

        Ok(Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
            lateral_vp,
            horizontal_vp,
        })
    }

    pub fn lateral_vanishing_point(&self) -> PixelPoint {
        self.lateral_vp
    }

    pub fn horizontal_vanishing_point(&self) -> PixelPoint {
        self.horizontal_vp
    }

    /// Build a `rows` x `columns` lattice over the trapezoid, plus
    /// `rows_before` extrapolated rows below the bottom edge and `rows_after`
    /// beyond the top edge. Row 0 is the lowest row.
    pub fn mesh(
        &self,
        rows: usize,
        columns: usize,
        rows_before: usize,
        rows_after: usize,
    ) -> CalibrationMesh {
        let first = -(rows_before as i64);
        let last = rows as i64 - 1 + rows_after as i64;

        let left = interpolate_projective(
            self.bottom_left,
            self.top_left,
            self.lateral_vp,
            rows,
            first,
            last,
        );
        let right = interpolate_projective(
            self.bottom_right,
            self.top_right,
            self.lateral_vp,
            rows,
            first,
            last,
        );

        let grid: Vec<Vec<PixelPoint>> = left
            .into_iter()
            .zip(right)
            .map(|(l, r)| {
                interpolate_projective(l, r, self.horizontal_vp, columns, 0, columns as i64 - 1)
            })
            .filter(|row| !row.is_empty())
            .collect();

        debug!(rows = grid.len(), columns, "projective mesh built");
        CalibrationMesh::new(grid)
    }
}

/// Points at fractional positions `i / (base_points - 1)` for `i` in
/// `first..=last` between `start` and `end`, both lying on a line through the
/// vanishing point `vp`.
///
/// Weights are proportional to the distance of the *opposite* endpoint from
/// the vanishing point, which is the exact image of uniform spacing under a
/// perspective projection. Indices outside `[0, base_points - 1]` extrapolate.
pub(crate) fn interpolate_projective(
    start: PixelPoint,
    end: PixelPoint,
    vp: PixelPoint,
    base_points: usize,
    first: i64,
    last: i64,
) -> Vec<PixelPoint> {
    if base_points < 2 {
        if base_points == 1 && first == 0 && last == 0 {
            return vec![start];
        }
        return Vec::new();
    }
    if last < first {
        return Vec::new();
    }

    let intervals = (base_points - 1) as f64;
    let d_start = start.distance(&vp);
    let d_end = end.distance(&vp);

    if d_start < 1e-9 && d_end < 1e-9 {
        return vec![start; (last - first + 1) as usize];
    }

    (first..=last)
        .map(|i| {
            let t = i as f64 / intervals;
            let w_start = d_end * (1.0 - t);
            let w_end = d_start * t;
            let denom = w_start + w_end;

            if denom.abs() < 1e-9 {
                if t < 0.5 { start } else { end }
            } else {
                PixelPoint::new(
                    (start.x * w_start + end.x * w_end) / denom,
                    (start.y * w_start + end.y * w_end) / denom,
                )
            }
        })
        .collect()
}
