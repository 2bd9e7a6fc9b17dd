//! Image kind for embedded raster artwork.

use super::{ObjectBody, ObjectStyle};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Image format for stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }

    /// The matching decoder format of the `image` crate.
    pub fn decoder_format(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

/// A raster image drawn at its natural pixel size in local space.
///
/// Display size comes from the owning object's scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Decoded width in pixels.
    pub natural_width: u32,
    /// Decoded height in pixels.
    pub natural_height: u32,
    /// Encoded format of `data_base64`.
    pub format: ImageFormat,
    /// Encoded image bytes, base64 so the scene stays plain JSON.
    pub data_base64: String,
}

impl Image {
    /// Wrap already-decoded metadata and the original encoded bytes.
    pub fn new(data: &[u8], natural_width: u32, natural_height: u32, format: ImageFormat) -> Self {
        Self {
            natural_width,
            natural_height,
            format,
            data_base64: STANDARD.encode(data),
        }
    }

    /// Decode the stored bytes.
    pub fn data(&self) -> Option<Vec<u8>> {
        STANDARD.decode(&self.data_base64).ok()
    }

    /// Data URL for hosts that display the image directly.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), self.data_base64)
    }

    /// Uniform scale that fits the natural size within `max_width` x `max_height`,
    /// never enlarging.
    pub fn fit_scale(&self, max_width: f64, max_height: f64) -> f64 {
        if self.natural_width == 0 || self.natural_height == 0 {
            return 1.0;
        }
        let sx = max_width / self.natural_width as f64;
        let sy = max_height / self.natural_height as f64;
        sx.min(sy).min(1.0)
    }
}

impl ObjectBody for Image {
    fn local_bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.natural_width as f64,
            self.natural_height as f64,
        )
    }

    fn to_path(&self) -> BezPath {
        self.local_bounds().to_path(0.1)
    }

    fn hit_test(&self, point: Point, tolerance: f64, _style: &ObjectStyle) -> bool {
        self.local_bounds().inflate(tolerance, tolerance).contains(point)
    }
}
