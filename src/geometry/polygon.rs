use serde::{Deserialize, Serialize};

use crate::geometry::PixelPoint;

/// Closed polygon in pixel space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<PixelPoint>,
}

/// Polygon with a label, e.g. a traffic lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPolygon {
    pub name: String,
    pub points: Polygon,
}

impl Polygon {
    pub fn new(points: Vec<PixelPoint>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Strict interior test: points on an edge or vertex are outside.
    ///
    /// Polygons with fewer than three vertices contain nothing.
    pub fn contains(&self, p: &PixelPoint) -> bool {
        let n = self.points.len();
        if n < 3 || !p.is_finite() {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];

            if on_segment(&a, &b, p) {
                return false;
            }

            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

fn on_segment(a: &PixelPoint, b: &PixelPoint, p: &PixelPoint) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > 1e-9 * (1.0 + a.distance(b)) {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Name of the first polygon whose strict interior contains `p`.
pub fn first_containing<'a>(zones: &'a [NamedPolygon], p: &PixelPoint) -> Option<&'a str> {
    zones
        .iter()
        .find(|zone| zone.points.contains(p))
        .map(|zone| zone.name.as_str())
}

/// Intersection of the line through `p1`,`p2` with the line through `p3`,`p4`.
///
/// Lines are taken in homogeneous form (cross product of the two points) and
/// normalised, so the weight of their intersection is the sine of the angle
/// between them. Returns `None` when the lines are parallel.
pub fn line_intersection(
    p1: &PixelPoint,
    p2: &PixelPoint,
    p3: &PixelPoint,
    p4: &PixelPoint,
) -> Option<PixelPoint> {
    let l1 = normalized_line(p1, p2)?;
    let l2 = normalized_line(p3, p4)?;
    let h = l1.cross(&l2);

    if h.z.abs() < 1e-9 {
        return None;
    }
    Some(PixelPoint::new(h.x / h.z, h.y / h.z))
}

fn normalized_line(a: &PixelPoint, b: &PixelPoint) -> Option<nalgebra::Vector3<f64>> {
    let line = a.to_homogeneous().cross(&b.to_homogeneous());
    let norm = line.x.hypot(line.y);
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some(line / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square() -> Polygon {
        Polygon::new(vec![
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(10.0, 0.0),
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(0.0, 10.0),
        ])
    }

    #[test]
    fn test_contains_interior() {
        assert!(square().contains(&PixelPoint::new(5.0, 5.0)));
        assert!(!square().contains(&PixelPoint::new(15.0, 5.0)));
        assert!(!square().contains(&PixelPoint::new(-0.1, 5.0)));
    }

    #[test]
    fn test_boundary_is_outside() {
        assert!(!square().contains(&PixelPoint::new(10.0, 5.0)));
        assert!(!square().contains(&PixelPoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape open at the top
        let u = Polygon::new(vec![
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(3.0, 0.0),
            PixelPoint::new(3.0, 8.0),
            PixelPoint::new(7.0, 8.0),
            PixelPoint::new(7.0, 0.0),
            PixelPoint::new(10.0, 0.0),
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(0.0, 10.0),
        ]);
        assert!(!u.contains(&PixelPoint::new(5.0, 4.0)));
        assert!(u.contains(&PixelPoint::new(5.0, 9.0)));
        assert!(u.contains(&PixelPoint::new(1.5, 4.0)));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let line = Polygon::new(vec![PixelPoint::new(0.0, 0.0), PixelPoint::new(10.0, 10.0)]);
        assert!(!line.contains(&PixelPoint::new(5.0, 5.0)));
    }

    #[test]
    fn test_first_containing_order() {
        let zones = vec![
            NamedPolygon {
                name: "left".into(),
                points: square(),
            },
            NamedPolygon {
                name: "wide".into(),
                points: Polygon::new(vec![
                    PixelPoint::new(-100.0, -100.0),
                    PixelPoint::new(100.0, -100.0),
                    PixelPoint::new(100.0, 100.0),
                    PixelPoint::new(-100.0, 100.0),
                ]),
            },
        ];
        assert_eq!(first_containing(&zones, &PixelPoint::new(5.0, 5.0)), Some("left"));
        assert_eq!(first_containing(&zones, &PixelPoint::new(50.0, 5.0)), Some("wide"));
        assert_eq!(first_containing(&zones, &PixelPoint::new(500.0, 5.0)), None);
    }

    #[test]
    fn test_line_intersection() {
        let p = line_intersection(
            &PixelPoint::new(0.0, 0.0),
            &PixelPoint::new(10.0, 10.0),
            &PixelPoint::new(0.0, 10.0),
            &PixelPoint::new(10.0, 0.0),
        )
        .unwrap();
        assert_abs_diff_eq!(p.x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_lines() {
        let p = line_intersection(
            &PixelPoint::new(0.0, 0.0),
            &PixelPoint::new(10.0, 0.0),
            &PixelPoint::new(0.0, 5.0),
            &PixelPoint::new(10.0, 5.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn test_polygon_from_json() {
        let poly: Polygon = serde_json::from_str("[[0,0],[4,0],[4,4]]").unwrap();
        assert_eq!(poly.points.len(), 3);
        assert_eq!(poly.points[1], PixelPoint::new(4.0, 0.0));
    }
}
