//! Pixel and ground-plane geometry: boxes, points, zones.

mod point;
mod polygon;
mod rect;

pub use point::{PixelPoint, WorldPoint};
pub use polygon::{NamedPolygon, Polygon, first_containing, line_intersection};
pub use rect::{Rect, iou_batch};
