//! PNG export of scenes and editor sessions.

use crate::renderer::{RasterBuffer, RenderContext, RenderError, RenderResult, Renderer};
use crate::skia_impl::SkiaRenderer;
use inkpress_core::{Editor, Scene};
use kurbo::Size;

const METERS_PER_INCH: f64 = 0.0254;

/// Rasterize the printable objects of `scene` on white.
pub fn export_raster(scene: &Scene, document_size: Size, multiplier: f64) -> RenderResult<RasterBuffer> {
    let ctx = RenderContext::new(scene, document_size).with_multiplier(multiplier);
    SkiaRenderer::new().render(&ctx)
}

/// Encode as an 8-bit RGBA PNG. A known DPI is written as a pHYs chunk.
pub fn encode_png(raster: &RasterBuffer) -> RenderResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, raster.width, raster.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(dpi) = raster.dpi.filter(|d| d.is_finite() && *d > 0.0) {
            let ppm = (dpi / METERS_PER_INCH).round() as u32;
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        writer
            .write_image_data(&raster.rgba)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        writer.finish().map_err(|e| RenderError::Encode(e.to_string()))?;
    }
    Ok(out)
}

/// Export operations on an editor session.
pub trait EditorExportExt {
    /// Raster of the document at `multiplier` output px per document px.
    fn export_raster(&self, multiplier: f64) -> RenderResult<RasterBuffer>;

    /// PNG at `multiplier` output px per document px.
    fn export_png(&self, multiplier: f64) -> RenderResult<Vec<u8>> {
        encode_png(&self.export_raster(multiplier)?)
    }

    /// PNG at the page's print resolution.
    fn export_high_res_png(&self) -> RenderResult<Vec<u8>>;

    /// PNG whose longer edge is `max_side` px.
    fn export_thumbnail_png(&self, max_side: u32) -> RenderResult<Vec<u8>>;
}

impl EditorExportExt for Editor {
    fn export_raster(&self, multiplier: f64) -> RenderResult<RasterBuffer> {
        let size = self.boxes().document_size();
        let raster = export_raster(self.scene(), size, multiplier)?;
        Ok(raster.with_dpi(self.display_dpi() * multiplier))
    }

    fn export_high_res_png(&self) -> RenderResult<Vec<u8>> {
        let multiplier = self.page().dpi / self.display_dpi();
        let raster = EditorExportExt::export_raster(self, multiplier)?;
        log::info!(
            "Exporting print PNG {}x{} at {} dpi",
            raster.width,
            raster.height,
            self.page().dpi
        );
        encode_png(&raster.with_dpi(self.page().dpi))
    }

    fn export_thumbnail_png(&self, max_side: u32) -> RenderResult<Vec<u8>> {
        let size = self.boxes().document_size();
        let longest = size.width.max(size.height);
        if max_side == 0 || longest <= 0.0 {
            return Err(RenderError::InvalidSize {
                width: max_side as f64,
                height: max_side as f64,
            });
        }
        self.export_png(max_side as f64 / longest)
    }
}
