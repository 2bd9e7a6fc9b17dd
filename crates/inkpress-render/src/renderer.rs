//! Renderer trait abstraction.

use inkpress_core::Scene;
use kurbo::Size;
use peniko::Color;
use thiserror::Error;

/// Largest raster edge a renderer will allocate.
pub const MAX_RASTER_EDGE: u32 = 16_384;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid raster size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("Font error: {0}")]
    Font(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Straight (non-premultiplied) RGBA pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    /// RGBA pixel data (4 bytes per pixel).
    pub rgba: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Resolution recorded in the encoded file, if known.
    pub dpi: Option<f64>,
}

impl RasterBuffer {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            dpi: None,
        }
    }

    /// Builder: record the physical resolution.
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Whether every pixel equals `rgba`.
    pub fn is_uniform(&self, rgba: [u8; 4]) -> bool {
        self.rgba.chunks_exact(4).all(|px| px == rgba)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Everything a renderer needs for one raster.
pub struct RenderContext<'a> {
    /// The scene to render.
    pub scene: &'a Scene,
    /// Size of the document surface in document px.
    pub document_size: Size,
    /// Output px per document px.
    pub multiplier: f64,
    /// Color the raster is cleared to.
    pub background: Color,
    /// Skip objects flagged `exclude_from_export`.
    pub honor_export_flag: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context at 1x on white, honoring export flags.
    pub fn new(scene: &'a Scene, document_size: Size) -> Self {
        Self {
            scene,
            document_size,
            multiplier: 1.0,
            background: Color::WHITE,
            honor_export_flag: true,
        }
    }

    /// Set the output multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Render non-printing objects too (false) or skip them (true).
    pub fn with_export_flag(mut self, honor: bool) -> Self {
        self.honor_export_flag = honor;
        self
    }

    /// Output raster size in px.
    pub fn output_size(&self) -> RenderResult<(u32, u32)> {
        let width = self.document_size.width * self.multiplier;
        let height = self.document_size.height * self.multiplier;
        let invalid = || RenderError::InvalidSize { width, height };
        if !(width.is_finite() && height.is_finite()) {
            return Err(invalid());
        }
        let (w, h) = (width.round(), height.round());
        if w < 1.0 || h < 1.0 || w > MAX_RASTER_EDGE as f64 || h > MAX_RASTER_EDGE as f64 {
            return Err(invalid());
        }
        Ok((w as u32, h as u32))
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send + Sync {
    /// Rasterize the context's scene.
    fn render(&self, ctx: &RenderContext) -> RenderResult<RasterBuffer>;
}
