//! Viewport controller: display DPI, pasteboard and pan/zoom transforms.
//!
//! Three pixel domains meet here. Document px are measured from the bleed box
//! origin at the effective display DPI. The pasteboard adds a neutral margin
//! around the document. Viewport px are what the host draws, after zoom and pan.

use crate::config::EditorConfig;
use crate::units::{PageSpec, mm_to_px, px_to_mm, round_half_up};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Derived display parameters handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// DPI actually used for the document surface.
    pub display_dpi: f64,
    pub pasteboard_padding_mm: f64,
    pub viewport_width_px: f64,
    pub viewport_height_px: f64,
    pub zoom: f64,
}

/// Pan/zoom state over the pasteboard.
#[derive(Debug, Clone)]
pub struct Viewport {
    requested_dpi: f64,
    effective_dpi: f64,
    padding_mm: f64,
    document_size: Size,
    padding_px: f64,
    viewport_size: Size,
    /// Current zoom level (1.0 = one document px per viewport px)
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    /// Pan offset in viewport px, relative to the centered position.
    pan: Vec2,
}

impl Viewport {
    /// Compute display geometry for a validated page.
    pub fn new(page: &PageSpec, config: &EditorConfig) -> Self {
        let requested_dpi = config.display_dpi;
        let padding_mm = config.pasteboard_padding_mm;
        let effective_dpi = surface_limited_dpi(page, padding_mm, requested_dpi, config.max_surface_px);

        if effective_dpi < requested_dpi {
            log::warn!(
                "Display DPI {requested_dpi} would exceed the {} px surface limit, using {effective_dpi:.3}",
                config.max_surface_px
            );
        }

        let document_size = Size::new(
            round_half_up(mm_to_px(page.bleed_width_mm(), effective_dpi)),
            round_half_up(mm_to_px(page.bleed_height_mm(), effective_dpi)),
        );

        Self {
            requested_dpi,
            effective_dpi,
            padding_mm,
            document_size,
            padding_px: round_half_up(mm_to_px(padding_mm, effective_dpi)),
            viewport_size: Size::new(config.viewport_width_px, config.viewport_height_px),
            zoom: 1.0_f64.clamp(config.min_zoom, config.max_zoom),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            pan: Vec2::ZERO,
        }
    }

    /// DPI asked for by the configuration.
    pub fn requested_dpi(&self) -> f64 {
        self.requested_dpi
    }

    /// DPI in use after applying the surface ceiling.
    pub fn effective_dpi(&self) -> f64 {
        self.effective_dpi
    }

    /// Size of the bleed box in document px.
    pub fn document_size(&self) -> Size {
        self.document_size
    }

    /// Width of the neutral margin in document px.
    pub fn padding_px(&self) -> f64 {
        self.padding_px
    }

    /// Document plus padding on every side.
    pub fn pasteboard_size(&self) -> Size {
        Size::new(
            self.document_size.width + 2.0 * self.padding_px,
            self.document_size.height + 2.0 * self.padding_px,
        )
    }

    /// Pasteboard rectangle in document px (starts at minus the padding).
    pub fn pasteboard_rect(&self) -> Rect {
        Rect::from_origin_size((-self.padding_px, -self.padding_px), self.pasteboard_size())
    }

    /// Position of the document within the pasteboard.
    pub fn document_offset(&self) -> Vec2 {
        Vec2::new(self.padding_px, self.padding_px)
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan
    }

    /// Resize the host container.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width.max(1.0), height.max(1.0));
    }

    /// Set zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Zoom, keeping the given viewport point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if !new_zoom.is_finite() || (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        // Convert screen point to document before zoom
        let doc_point = self.screen_to_document(screen_point);

        self.zoom = new_zoom;

        // Adjust pan so doc_point stays at screen_point
        let new_screen = self.document_to_screen(doc_point);
        self.pan += screen_point - new_screen;
    }

    /// Pan by a delta in viewport px.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Back to 100% and centered.
    pub fn reset(&mut self) {
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
        self.pan = Vec2::ZERO;
    }

    /// Zoom so the whole pasteboard fits the viewport, centered.
    pub fn fit(&mut self) {
        let board = self.pasteboard_size();
        let scale_x = self.viewport_size.width / board.width;
        let scale_y = self.viewport_size.height / board.height;
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);
        self.pan = Vec2::ZERO;
    }

    /// Document px to viewport px.
    pub fn transform(&self) -> Affine {
        let board = self.pasteboard_size();
        let centering = Vec2::new(
            (self.viewport_size.width - board.width * self.zoom) / 2.0,
            (self.viewport_size.height - board.height * self.zoom) / 2.0,
        );
        Affine::translate(centering + self.pan)
            * Affine::scale(self.zoom)
            * Affine::translate(self.document_offset())
    }

    /// Viewport px to document px.
    pub fn inverse_transform(&self) -> Affine {
        self.transform().inverse()
    }

    /// Convert a viewport point to document px.
    pub fn screen_to_document(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a document point to viewport px.
    pub fn document_to_screen(&self, doc_point: Point) -> Point {
        self.transform() * doc_point
    }

    /// Millimeters to document px at the effective DPI.
    pub fn mm_to_px(&self, mm: f64) -> f64 {
        mm_to_px(mm, self.effective_dpi)
    }

    /// Document px to millimeters at the effective DPI.
    pub fn px_to_mm(&self, px: f64) -> f64 {
        px_to_mm(px, self.effective_dpi)
    }

    /// Derived display parameters.
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            display_dpi: self.effective_dpi,
            pasteboard_padding_mm: self.padding_mm,
            viewport_width_px: self.viewport_size.width,
            viewport_height_px: self.viewport_size.height,
            zoom: self.zoom,
        }
    }
}

/// Scale `dpi` down until the pasteboard fits within `max_surface_px`.
fn surface_limited_dpi(page: &PageSpec, padding_mm: f64, dpi: f64, max_surface_px: f64) -> f64 {
    let widest_mm = (page.bleed_width_mm() + 2.0 * padding_mm).max(page.bleed_height_mm() + 2.0 * padding_mm);
    let widest_px = mm_to_px(widest_mm, dpi);
    if widest_px <= max_surface_px {
        dpi
    } else {
        dpi * max_surface_px / widest_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> PageSpec {
        PageSpec::new(85.0, 55.0, 3.0, 300.0, 3.0).unwrap()
    }

    fn assert_point_eq(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_document_and_pasteboard_size() {
        let viewport = Viewport::new(&card(), &EditorConfig::default());
        assert_eq!(viewport.document_size(), Size::new(182.0, 122.0));
        assert!((viewport.padding_px() - 40.0).abs() < f64::EPSILON);
        assert_eq!(viewport.pasteboard_size(), Size::new(262.0, 202.0));
        assert!((viewport.effective_dpi() - 50.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_surface_ceiling_lowers_dpi() {
        let poster = PageSpec::new(1000.0, 700.0, 5.0, 150.0, 10.0).unwrap();
        let config = EditorConfig {
            display_dpi: 300.0,
            ..EditorConfig::default()
        };
        let viewport = Viewport::new(&poster, &config);
        assert!(viewport.effective_dpi() < 300.0);
        let board = viewport.pasteboard_size();
        assert!(board.width <= 8192.0 + 2.0);
        assert!(board.height <= 8192.0 + 2.0);
        assert!((viewport.requested_dpi() - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pasteboard_centered_at_unit_zoom() {
        let mut viewport = Viewport::new(&card(), &EditorConfig::default());
        viewport.set_viewport_size(462.0, 402.0);
        // Pasteboard 262x202 centered leaves 100 px on each side.
        assert_point_eq(viewport.document_to_screen(Point::ZERO), Point::new(140.0, 140.0));
    }

    #[test]
    fn test_round_trip_screen_document() {
        let mut viewport = Viewport::new(&card(), &EditorConfig::default());
        viewport.set_zoom(1.7);
        viewport.pan(Vec2::new(13.0, -8.0));
        let doc = Point::new(33.0, 71.0);
        assert_point_eq(viewport.screen_to_document(viewport.document_to_screen(doc)), doc);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = Viewport::new(&card(), &EditorConfig::default());
        viewport.set_zoom(10.0);
        assert!((viewport.zoom() - 3.0).abs() < f64::EPSILON);
        viewport.set_zoom(0.01);
        assert!((viewport.zoom() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut viewport = Viewport::new(&card(), &EditorConfig::default());
        let anchor = Point::new(300.0, 250.0);
        let before = viewport.screen_to_document(anchor);
        viewport.zoom_at(anchor, 2.0);
        assert!((viewport.zoom() - 2.0).abs() < f64::EPSILON);
        assert_point_eq(viewport.screen_to_document(anchor), before);
    }

    #[test]
    fn test_fit_and_reset() {
        let mut viewport = Viewport::new(&card(), &EditorConfig::default());
        viewport.set_viewport_size(524.0, 1000.0);
        viewport.pan(Vec2::new(50.0, 50.0));
        viewport.fit();
        assert!((viewport.zoom() - 2.0).abs() < 1e-9);
        assert_eq!(viewport.pan_offset(), Vec2::ZERO);

        viewport.reset();
        assert!((viewport.zoom() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display_config() {
        let viewport = Viewport::new(&card(), &EditorConfig::default());
        let display = viewport.display_config();
        assert!((display.display_dpi - 50.8).abs() < f64::EPSILON);
        assert!((display.pasteboard_padding_mm - 20.0).abs() < f64::EPSILON);
        assert!((viewport.px_to_mm(viewport.mm_to_px(12.5)) - 12.5).abs() < 1e-9);
    }
}
