//! Text kind.

use super::{ObjectBody, ObjectStyle};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Family used for newly placed text.
pub const DEFAULT_FONT_FAMILY: &str = "Open Sans";

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    /// Light weight.
    Light,
    /// Regular weight (default).
    #[default]
    Regular,
    /// Bold weight.
    Bold,
}

impl FontWeight {
    /// CSS-style numeric weight.
    pub fn numeric(&self) -> u16 {
        match self {
            FontWeight::Light => 300,
            FontWeight::Regular => 400,
            FontWeight::Bold => 700,
        }
    }

    /// Get display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            FontWeight::Light => "Light",
            FontWeight::Regular => "Regular",
            FontWeight::Bold => "Bold",
        }
    }

    /// Get all available font weights.
    pub fn all() -> &'static [FontWeight] {
        &[FontWeight::Light, FontWeight::Regular, FontWeight::Bold]
    }

    /// Average glyph advance as a fraction of the font size.
    fn width_factor(&self) -> f64 {
        match self {
            FontWeight::Light => 0.5,
            FontWeight::Regular => 0.55,
            FontWeight::Bold => 0.6,
        }
    }
}

/// Horizontal alignment of lines within the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A block of text anchored at the top-left of its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// The text content. Lines are separated by `\n`.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in document px.
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub align: TextAlign,
    /// Line advance as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
}

fn default_line_height() -> f64 {
    1.16
}

impl Text {
    /// Create a text body in the default family.
    pub fn new(content: impl Into<String>, font_size: f64) -> Self {
        Self {
            content: content.into(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size,
            font_weight: FontWeight::Regular,
            italic: false,
            align: TextAlign::Left,
            line_height: default_line_height(),
        }
    }

    /// Lines of the content. Empty content still has one line.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines().count()
    }

    /// Approximate box size from character counts.
    pub fn approximate_size(&self) -> (f64, f64) {
        let max_chars = self.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = (max_chars as f64 * self.font_size * self.font_weight.width_factor())
            .max(self.font_size * 0.5);
        let height = self.line_count() as f64 * self.font_size * self.line_height;
        (width, height)
    }
}

impl ObjectBody for Text {
    fn local_bounds(&self) -> Rect {
        let (width, height) = self.approximate_size();
        Rect::new(0.0, 0.0, width, height)
    }

    fn to_path(&self) -> BezPath {
        self.local_bounds().to_path(0.1)
    }

    fn hit_test(&self, point: Point, tolerance: f64, _style: &ObjectStyle) -> bool {
        self.local_bounds().inflate(tolerance, tolerance).contains(point)
    }
}
