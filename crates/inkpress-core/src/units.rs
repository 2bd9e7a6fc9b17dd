//! Physical page geometry and millimeter/pixel conversion.
//!
//! Document pixels are measured from the top-left corner of the bleed box. Every
//! box edge is rounded independently so that neighbouring guides share integer
//! edges at any DPI.

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Errors raised when a page or display configuration is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A dimension that must be strictly positive was zero, negative or not finite.
    #[error("{field} must be a positive number, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    /// A margin that must be zero or positive was negative or not finite.
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    /// The safe inset consumes the whole trim box.
    #[error("safe area of {safe_area_mm} mm leaves no printable region on a {width_mm}x{height_mm} mm page")]
    SafeAreaTooLarge {
        safe_area_mm: f64,
        width_mm: f64,
        height_mm: f64,
    },
    /// A display or session setting is out of range.
    #[error("invalid editor configuration: {0}")]
    InvalidConfig(String),
}

/// Convert millimeters to pixels at the given DPI.
pub fn mm_to_px(mm: f64, dpi: f64) -> f64 {
    mm / MM_PER_INCH * dpi
}

/// Convert pixels at the given DPI back to millimeters.
pub fn px_to_mm(px: f64, dpi: f64) -> f64 {
    px / dpi * MM_PER_INCH
}

/// Round to the nearest integer, ties toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Physical description of a printed page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Finished (trimmed) width.
    pub width_mm: f64,
    /// Finished (trimmed) height.
    pub height_mm: f64,
    /// Extra margin printed beyond the trim line on every side.
    #[serde(default)]
    pub bleed_mm: f64,
    /// Print resolution used for high-resolution export.
    pub dpi: f64,
    /// Inset from the trim line that content should stay within.
    #[serde(default)]
    pub safe_area_mm: f64,
}

impl PageSpec {
    /// Create a validated page description.
    pub fn new(
        width_mm: f64,
        height_mm: f64,
        bleed_mm: f64,
        dpi: f64,
        safe_area_mm: f64,
    ) -> Result<Self, GeometryError> {
        let page = Self {
            width_mm,
            height_mm,
            bleed_mm,
            dpi,
            safe_area_mm,
        };
        page.validate()?;
        Ok(page)
    }

    /// Check every field. Values are never coerced.
    pub fn validate(&self) -> Result<(), GeometryError> {
        positive("width_mm", self.width_mm)?;
        positive("height_mm", self.height_mm)?;
        positive("dpi", self.dpi)?;
        non_negative("bleed_mm", self.bleed_mm)?;
        non_negative("safe_area_mm", self.safe_area_mm)?;

        if 2.0 * self.safe_area_mm >= self.width_mm.min(self.height_mm) {
            return Err(GeometryError::SafeAreaTooLarge {
                safe_area_mm: self.safe_area_mm,
                width_mm: self.width_mm,
                height_mm: self.height_mm,
            });
        }
        Ok(())
    }

    /// Width of the bleed box in millimeters.
    pub fn bleed_width_mm(&self) -> f64 {
        self.width_mm + 2.0 * self.bleed_mm
    }

    /// Height of the bleed box in millimeters.
    pub fn bleed_height_mm(&self) -> f64 {
        self.height_mm + 2.0 * self.bleed_mm
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GeometryError::Negative { field, value })
    }
}

/// The three nested page rectangles in document pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBoxes {
    /// Full printed area including bleed. Always starts at the origin.
    pub bleed: Rect,
    /// Finished page edge.
    pub trim: Rect,
    /// Region content should stay inside.
    pub safe: Rect,
}

impl PageBoxes {
    /// Size of the document surface (the bleed box).
    pub fn document_size(&self) -> kurbo::Size {
        self.bleed.size()
    }
}

/// Compute bleed, trim and safe boxes for `page` at `dpi`.
///
/// The page must already be validated.
pub fn compute_page_boxes(page: &PageSpec, dpi: f64) -> PageBoxes {
    let edge = |mm: f64| round_half_up(mm_to_px(mm, dpi));

    let bleed_w = page.bleed_width_mm();
    let bleed_h = page.bleed_height_mm();
    let trim_near = page.bleed_mm;
    let safe_near = page.bleed_mm + page.safe_area_mm;

    PageBoxes {
        bleed: Rect::new(0.0, 0.0, edge(bleed_w), edge(bleed_h)),
        trim: Rect::new(
            edge(trim_near),
            edge(trim_near),
            edge(bleed_w - page.bleed_mm),
            edge(bleed_h - page.bleed_mm),
        ),
        safe: Rect::new(
            edge(safe_near),
            edge(safe_near),
            edge(bleed_w - safe_near),
            edge(bleed_h - safe_near),
        ),
    }
}
