//! Arbitrary vector outline, used for cut contours and imported SVG artwork.

use super::{ObjectBody, ObjectStyle};
use kurbo::{Affine, BezPath, ParamCurveNearest, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A bezier outline in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    pub path: BezPath,
}

impl VectorPath {
    pub fn new(path: BezPath) -> Self {
        Self { path }
    }

    /// Translate the outline so its bounding box starts at the local origin.
    /// Returns the offset that was removed.
    pub fn normalize_origin(&mut self) -> Point {
        let origin = self.path.bounding_box().origin();
        self.path
            .apply_affine(Affine::translate((-origin.x, -origin.y)));
        origin
    }

    /// Whether the path has no drawing segments.
    pub fn is_empty(&self) -> bool {
        self.path.segments().next().is_none()
    }
}

impl ObjectBody for VectorPath {
    fn local_bounds(&self) -> Rect {
        if self.is_empty() {
            return Rect::ZERO;
        }
        self.path.bounding_box()
    }

    fn to_path(&self) -> BezPath {
        self.path.clone()
    }

    fn hit_test(&self, point: Point, tolerance: f64, style: &ObjectStyle) -> bool {
        if style.fill.is_some() && self.path.contains(point) {
            return true;
        }
        let reach = tolerance + style.stroke_width / 2.0;
        self.path
            .segments()
            .any(|seg| seg.nearest(point, 0.1).distance_sq <= reach * reach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to((offset, offset));
        path.line_to((offset + 10.0, offset));
        path.line_to((offset, offset + 10.0));
        path.close_path();
        path
    }

    #[test]
    fn test_normalize_origin() {
        let mut vector = VectorPath::new(triangle(25.0));
        let origin = vector.normalize_origin();
        assert_eq!(origin, Point::new(25.0, 25.0));
        assert_eq!(vector.local_bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_empty_path_bounds() {
        let vector = VectorPath::new(BezPath::new());
        assert!(vector.is_empty());
        assert_eq!(vector.local_bounds(), Rect::ZERO);
    }

    #[test]
    fn test_path_hit_test() {
        let vector = VectorPath::new(triangle(0.0));
        let filled = ObjectStyle::default();
        assert!(vector.hit_test(Point::new(2.0, 2.0), 0.0, &filled));
        assert!(!vector.hit_test(Point::new(9.0, 9.0), 0.0, &filled));

        let outline = ObjectStyle::outline(super::super::SerializableColor::black(), 1.0);
        assert!(vector.hit_test(Point::new(5.0, 0.2), 0.0, &outline));
        assert!(!vector.hit_test(Point::new(2.0, 2.0), 0.0, &outline));
    }
}
