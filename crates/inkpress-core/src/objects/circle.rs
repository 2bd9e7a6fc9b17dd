//! Circle kind.

use super::{ObjectBody, ObjectStyle};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A circle whose bounding box is anchored at the local origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub radius: f64,
}

impl Circle {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Center in local space.
    pub fn center(&self) -> Point {
        Point::new(self.radius, self.radius)
    }
}

impl ObjectBody for Circle {
    fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, 2.0 * self.radius, 2.0 * self.radius)
    }

    fn to_path(&self) -> BezPath {
        kurbo::Circle::new(self.center(), self.radius).to_path(0.1)
    }

    fn hit_test(&self, point: Point, tolerance: f64, style: &ObjectStyle) -> bool {
        let distance = point.distance(self.center());
        if style.fill.is_some() {
            distance <= self.radius + tolerance
        } else {
            (distance - self.radius).abs() <= tolerance + style.stroke_width / 2.0
        }
    }
}
