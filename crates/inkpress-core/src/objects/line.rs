//! Line kind.

use super::{ObjectBody, ObjectStyle, point_to_segment_dist};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// A straight segment between two local points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Length of the segment.
    pub fn length(&self) -> f64 {
        self.start().distance(self.end())
    }
}

impl ObjectBody for Line {
    fn local_bounds(&self) -> Rect {
        Rect::from_points(self.start(), self.end())
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start());
        path.line_to(self.end());
        path
    }

    fn hit_test(&self, point: Point, tolerance: f64, style: &ObjectStyle) -> bool {
        point_to_segment_dist(point, self.start(), self.end()) <= tolerance + style.stroke_width / 2.0
    }
}
