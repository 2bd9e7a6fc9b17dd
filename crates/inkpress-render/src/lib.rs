//! Inkpress Render Library
//!
//! Renderer abstraction and the tiny-skia raster backend used for PNG export.
//! Text is drawn from glyph outlines of faces found through fontdb.

pub mod export;
pub mod fonts;
mod renderer;
mod skia_impl;

pub use export::{EditorExportExt, encode_png, export_raster};
pub use fonts::FontResolver;
pub use renderer::{MAX_RASTER_EDGE, RasterBuffer, RenderContext, RenderError, RenderResult, Renderer};
pub use skia_impl::SkiaRenderer;
