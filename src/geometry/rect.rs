use crate::geometry::PixelPoint;

/// Axis-aligned bounding box in pixel space.
///
/// Stored as top-left corner plus size. Detectors hand boxes over in TLBR
/// form (x1, y1, x2, y2); use [`Rect::from_tlbr`] for those.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Centroid of the box.
    #[inline]
    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Point where the object touches the ground: horizontal midpoint of the
    /// bottom edge.
    #[inline]
    pub fn ground_contact(&self) -> PixelPoint {
        PixelPoint::new(
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height),
        )
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when all coordinates are finite and the box has positive extent.
    pub fn is_valid(&self) -> bool {
        self.to_tlwh().iter().all(|v| v.is_finite()) && self.width > 0.0 && self.height > 0.0
    }

    /// Divide every coordinate by `factor`. Used to map boxes produced at
    /// inference resolution back into frame space.
    pub fn scaled_down(&self, factor: f32) -> Self {
        if factor == 1.0 || factor == 0.0 {
            return *self;
        }
        Self::new(
            self.x / factor,
            self.y / factor,
            self.width / factor,
            self.height / factor,
        )
    }

    /// Integer pixel region `(x1, y1, x2, y2)` of this box clipped to a frame
    /// of `frame_width` x `frame_height`. Coordinates are truncated toward
    /// zero before clipping. Returns `None` when nothing is left.
    pub fn clip_to_frame(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        if !self.to_tlwh().iter().all(|v| v.is_finite()) {
            return None;
        }
        let [x1, y1, x2, y2] = self.to_tlbr().map(|v| v.trunc() as i64);
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(i64::from(frame_width));
        let y2 = y2.min(i64::from(frame_height));
        if x1 >= x2 || y1 >= y2 {
            return None;
        }
        Some((x1 as u32, y1 as u32, x2 as u32, y2 as u32))
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

use ndarray::Array2;

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut dists = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            dists[[i, j]] = a.iou(b);
        }
    }
    dists
}
