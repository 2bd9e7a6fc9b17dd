//! Rectangle kind.

use super::{ObjectBody, ObjectStyle};
use kurbo::{BezPath, Point, Rect, RoundedRect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A rectangle with optional rounded corners, anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Width in local units.
    pub width: f64,
    /// Height in local units.
    pub height: f64,
    /// Corner radius (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
}

impl Rectangle {
    /// Create a sharp-cornered rectangle.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            corner_radius: 0.0,
        }
    }

    /// Builder: round the corners.
    pub fn with_corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = radius.max(0.0);
        self
    }

    /// The rectangle as a kurbo Rect in local space.
    pub fn as_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

impl ObjectBody for Rectangle {
    fn local_bounds(&self) -> Rect {
        self.as_rect()
    }

    fn to_path(&self) -> BezPath {
        let radius = self.corner_radius.min(self.width.min(self.height) / 2.0);
        if radius > 0.0 {
            RoundedRect::from_rect(self.as_rect(), radius).to_path(0.1)
        } else {
            self.as_rect().to_path(0.1)
        }
    }

    fn hit_test(&self, point: Point, tolerance: f64, style: &ObjectStyle) -> bool {
        let rect = self.as_rect();
        if style.fill.is_some() {
            // Filled: hit anywhere inside
            rect.inflate(tolerance, tolerance).contains(point)
        } else {
            // Outline only: hit on the border
            let reach = tolerance + style.stroke_width / 2.0;
            let outer = rect.inflate(reach, reach);
            let inner = rect.inflate(-reach, -reach);
            outer.contains(point) && !inner.contains(point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_bounds() {
        let rect = Rectangle::new(100.0, 50.0);
        assert_eq!(rect.local_bounds(), Rect::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn test_outline_hit_test() {
        let rect = Rectangle::new(100.0, 50.0);
        let style = ObjectStyle::outline(super::super::SerializableColor::black(), 2.0);
        assert!(rect.hit_test(Point::new(0.0, 25.0), 1.0, &style));
        assert!(!rect.hit_test(Point::new(50.0, 25.0), 1.0, &style));
    }

    #[test]
    fn test_corner_radius_clamped_in_path() {
        let rect = Rectangle::new(10.0, 10.0).with_corner_radius(50.0);
        let bounds = rect.to_path().bounding_box();
        assert!((bounds.width() - 10.0).abs() < 1e-6);
    }
}
