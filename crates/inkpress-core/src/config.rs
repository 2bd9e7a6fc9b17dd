//! Editor session configuration.

use crate::units::GeometryError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Display DPI used when none is configured (2 px per mm).
pub const DEFAULT_DISPLAY_DPI: f64 = 50.8;

/// Tunable settings for an editor session.
///
/// Every field has a default, so a partial JSON file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Requested on-screen density of the document surface.
    pub display_dpi: f64,
    /// Neutral margin shown around the bleed box.
    pub pasteboard_padding_mm: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Largest allowed pasteboard side in pixels.
    pub max_surface_px: f64,
    /// Number of snapshots kept by the undo history.
    pub history_capacity: usize,
    /// Offset applied to duplicated objects.
    pub duplicate_offset_px: f64,
    pub viewport_width_px: f64,
    pub viewport_height_px: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            display_dpi: DEFAULT_DISPLAY_DPI,
            pasteboard_padding_mm: 20.0,
            min_zoom: 0.4,
            max_zoom: 3.0,
            max_surface_px: 8192.0,
            history_capacity: 50,
            duplicate_offset_px: 10.0,
            viewport_width_px: 1280.0,
            viewport_height_px: 800.0,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GeometryError> {
        let config: EditorConfig = serde_json::from_str(json)
            .map_err(|e| GeometryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, GeometryError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GeometryError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let invalid = |msg: String| Err(GeometryError::InvalidConfig(msg));

        if !(self.display_dpi.is_finite() && self.display_dpi > 0.0) {
            return invalid(format!("display_dpi must be positive, got {}", self.display_dpi));
        }
        if !(self.pasteboard_padding_mm.is_finite() && self.pasteboard_padding_mm >= 0.0) {
            return invalid(format!(
                "pasteboard_padding_mm must not be negative, got {}",
                self.pasteboard_padding_mm
            ));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom && self.max_zoom.is_finite()) {
            return invalid(format!(
                "zoom range {}..{} is empty or not positive",
                self.min_zoom, self.max_zoom
            ));
        }
        if !(self.max_surface_px >= 1.0 && self.max_surface_px.is_finite()) {
            return invalid(format!("max_surface_px must be at least 1, got {}", self.max_surface_px));
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity must be at least 1".to_string());
        }
        if !(self.viewport_width_px > 0.0 && self.viewport_height_px > 0.0) {
            return invalid(format!(
                "viewport {}x{} must be positive",
                self.viewport_width_px, self.viewport_height_px
            ));
        }
        Ok(())
    }
}
