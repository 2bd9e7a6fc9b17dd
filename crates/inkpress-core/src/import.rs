//! Import of external vector, raster and scene content.
//!
//! Every importer either returns a complete object or an error; nothing is
//! inserted into a scene here.

use crate::objects::{
    Group, Image, ImageFormat, ObjectKind, ObjectStyle, SceneObject, SerializableColor, VectorPath,
};
use crate::scene::SceneState;
use kurbo::{Affine, BezPath, Point, Shape as KurboShape, Size};
use thiserror::Error;
use usvg::tiny_skia_path::PathSegment;

/// Resolution SVG user units are defined at.
pub const SVG_NATIVE_DPI: f64 = 96.0;

/// Largest share of the document an imported vector may cover.
pub const VECTOR_FIT_RATIO: f64 = 0.9;

/// Largest share of the document an imported raster may cover.
pub const RASTER_FIT_RATIO: f64 = 0.8;

/// Errors raised while decoding imported content.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not parse SVG: {0}")]
    Svg(String),
    #[error("SVG contains no visible vector paths")]
    EmptyVector,
    #[error("could not decode image: {0}")]
    Raster(String),
    #[error("unsupported image format (expected PNG, JPEG or WebP)")]
    UnsupportedFormat,
    #[error("could not read scene JSON: {0}")]
    Json(String),
}

/// Where imported content is going to land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportContext {
    /// Effective display DPI of the target scene.
    pub display_dpi: f64,
    /// Print DPI of the page, used when a raster carries no resolution.
    pub print_dpi: f64,
    /// Bleed box size in document px.
    pub document_size: Size,
}

impl ImportContext {
    fn document_center(&self) -> Point {
        Point::new(self.document_size.width / 2.0, self.document_size.height / 2.0)
    }
}

/// Shrink factor (at most 1) that fits `size` within `ratio` of the document.
fn fit_factor(size: Size, ratio: f64, document: Size) -> f64 {
    let max_w = document.width * ratio;
    let max_h = document.height * ratio;
    let mut factor: f64 = 1.0;
    if size.width > max_w && size.width > 0.0 {
        factor = factor.min(max_w / size.width);
    }
    if size.height > max_h && size.height > 0.0 {
        factor = factor.min(max_h / size.height);
    }
    factor
}

/// Scale applied to vector artwork whose bounds are `size` in SVG px.
pub fn vector_scale(size: Size, ctx: &ImportContext) -> f64 {
    let base = ctx.display_dpi / SVG_NATIVE_DPI;
    base * fit_factor(size * base, VECTOR_FIT_RATIO, ctx.document_size)
}

/// Scale applied to a raster of `width` x `height` pixels.
///
/// A known source DPI gives the image its physical size. Otherwise the page's
/// print DPI is assumed and the result is capped to fit the document.
pub fn raster_scale(width: u32, height: u32, source_dpi: Option<f64>, ctx: &ImportContext) -> f64 {
    if let Some(dpi) = source_dpi.filter(|d| d.is_finite() && *d > 0.0) {
        return ctx.display_dpi / dpi;
    }
    let base = ctx.display_dpi / ctx.print_dpi;
    let size = Size::new(width as f64 * base, height as f64 * base);
    base * fit_factor(size, RASTER_FIT_RATIO, ctx.document_size)
}

/// Convert an SVG document into one path object, or a group of path objects.
pub fn import_svg(svg: &str, ctx: &ImportContext) -> Result<SceneObject, ImportError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| ImportError::Svg(e.to_string()))?;

    let mut paths = Vec::new();
    collect_paths(tree.root(), 1.0, &mut paths);

    let bounds = paths
        .iter()
        .map(|(path, _)| path.bounding_box())
        .reduce(|a, b| a.union(b))
        .filter(|b| b.width() > 0.0 || b.height() > 0.0)
        .ok_or(ImportError::EmptyVector)?;

    let scale = vector_scale(bounds.size(), ctx);
    let shift = Affine::translate((-bounds.x0, -bounds.y0));
    let mut children: Vec<SceneObject> = paths
        .into_iter()
        .map(|(mut path, style)| {
            path.apply_affine(shift);
            SceneObject::new(ObjectKind::Path(VectorPath::new(path))).with_style(style)
        })
        .collect();

    log::info!(
        "Imported SVG with {} paths, {:.0}x{:.0} px at scale {scale:.4}",
        children.len(),
        bounds.width(),
        bounds.height()
    );

    let mut object = if children.len() == 1 {
        children.remove(0)
    } else {
        SceneObject::new(ObjectKind::Group(Group::new(children)))
            .with_style(ObjectStyle {
                fill: None,
                ..ObjectStyle::default()
            })
    };
    object.name = "Vector artwork".to_string();
    object.scale_x = scale;
    object.scale_y = scale;
    object.center_on(ctx.document_center());
    Ok(object)
}

fn collect_paths(group: &usvg::Group, opacity: f64, out: &mut Vec<(BezPath, ObjectStyle)>) {
    let opacity = opacity * group.opacity().get() as f64;
    for node in group.children() {
        match node {
            usvg::Node::Group(child) => collect_paths(child, opacity, out),
            usvg::Node::Path(path) => {
                if path.is_visible() {
                    if let Some(converted) = convert_path(path, opacity) {
                        out.push(converted);
                    }
                }
            }
            usvg::Node::Text(text) => collect_paths(text.flattened(), opacity, out),
            usvg::Node::Image(_) => log::warn!("Skipping embedded image in SVG import"),
        }
    }
}

fn convert_path(path: &usvg::Path, opacity: f64) -> Option<(BezPath, ObjectStyle)> {
    let ts = path.abs_transform();
    let affine = Affine::new([
        ts.sx as f64,
        ts.ky as f64,
        ts.kx as f64,
        ts.sy as f64,
        ts.tx as f64,
        ts.ty as f64,
    ]);

    let mut bez = BezPath::new();
    let pt = |p: usvg::tiny_skia_path::Point| Point::new(p.x as f64, p.y as f64);
    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => bez.move_to(pt(p)),
            PathSegment::LineTo(p) => bez.line_to(pt(p)),
            PathSegment::QuadTo(p1, p) => bez.quad_to(pt(p1), pt(p)),
            PathSegment::CubicTo(p1, p2, p) => bez.curve_to(pt(p1), pt(p2), pt(p)),
            PathSegment::Close => bez.close_path(),
        }
    }
    bez.apply_affine(affine);

    let fill = path
        .fill()
        .and_then(|f| paint_color(f.paint()).map(|c| c.with_opacity(f.opacity().get() as f64)));
    let stroke = path.stroke().and_then(|s| {
        paint_color(s.paint()).map(|c| (c.with_opacity(s.opacity().get() as f64), s.width().get() as f64))
    });
    if fill.is_none() && stroke.is_none() {
        return None;
    }

    let style = ObjectStyle {
        fill,
        stroke: stroke.map(|(c, _)| c),
        stroke_width: stroke.map_or(0.0, |(_, w)| w * affine.determinant().abs().sqrt()),
        stroke_dash: Vec::new(),
        opacity,
    };
    Some((bez, style))
}

/// Solid color of a paint. Gradients use their first stop.
fn paint_color(paint: &usvg::Paint) -> Option<SerializableColor> {
    let color = |c: usvg::Color| SerializableColor::new(c.red, c.green, c.blue, 255);
    match paint {
        usvg::Paint::Color(c) => Some(color(*c)),
        usvg::Paint::LinearGradient(g) => g.stops().first().map(|s| color(s.color())),
        usvg::Paint::RadialGradient(g) => g.stops().first().map(|s| color(s.color())),
        usvg::Paint::Pattern(_) => {
            log::debug!("Pattern paint replaced by black");
            Some(SerializableColor::black())
        }
    }
}

/// Decode a PNG, JPEG or WebP image into an image object.
pub fn import_raster(
    bytes: &[u8],
    source_dpi: Option<f64>,
    ctx: &ImportContext,
) -> Result<SceneObject, ImportError> {
    let format = ImageFormat::from_magic_bytes(bytes).ok_or(ImportError::UnsupportedFormat)?;
    let decoded = image::load_from_memory_with_format(bytes, format.decoder_format())
        .map_err(|e| ImportError::Raster(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(ImportError::Raster("image has no pixels".to_string()));
    }

    let scale = raster_scale(width, height, source_dpi, ctx);
    log::info!("Imported {width}x{height} {} at scale {scale:.4}", format.mime_type());

    let mut object = SceneObject::new(ObjectKind::Image(Image::new(bytes, width, height, format)))
        .with_scale(scale)
        .with_name("Image");
    object.center_on(ctx.document_center());
    Ok(object)
}

/// Content objects of another serialized scene, rescaled to `display_dpi`.
pub fn import_scene_json(json: &str, display_dpi: f64) -> Result<Vec<SceneObject>, ImportError> {
    let mut state = SceneState::from_json(json).map_err(|e| ImportError::Json(e.to_string()))?;
    state.rescale_to(display_dpi);
    Ok(state
        .objects
        .into_iter()
        .filter(|o| o.role.is_content())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectRole;
    use std::io::Cursor;

    fn ctx() -> ImportContext {
        ImportContext {
            display_dpi: 50.8,
            print_dpi: 300.0,
            document_size: Size::new(182.0, 122.0),
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_raster_scale_from_source_dpi() {
        let ctx = ctx();
        assert!((raster_scale(10, 10, Some(50.8), &ctx) - 1.0).abs() < 1e-9);
        assert!((raster_scale(10, 10, Some(101.6), &ctx) - 0.5).abs() < 1e-9);
        assert!((raster_scale(10, 10, Some(150.0), &ctx) - 0.338_666).abs() < 1e-5);
    }

    #[test]
    fn test_raster_scale_falls_back_to_print_dpi() {
        let ctx = ctx();
        assert!((raster_scale(10, 10, None, &ctx) - 50.8 / 300.0).abs() < 1e-9);
        assert!((raster_scale(10, 10, Some(0.0), &ctx) - 50.8 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_raster_scale_fallback_capped_at_eighty_percent() {
        let ctx = ctx();
        let scale = raster_scale(5000, 5000, None, &ctx);
        assert!((5000.0 * scale - 122.0 * 0.8).abs() < 1e-9);

        // Small images at print DPI are not enlarged.
        let scale = raster_scale(30, 30, None, &ctx);
        assert!((scale - 50.8 / 300.0).abs() < 1e-12);
    }

    #[test]
    fn test_raster_scale_with_source_dpi_is_physical() {
        let ctx = ctx();
        assert_eq!(raster_scale(1000, 100, Some(50.8), &ctx), 1.0);
        assert!((raster_scale(5000, 5000, Some(101.6), &ctx) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_import_raster_centers_image() {
        let object = import_raster(&png(40, 20), Some(50.8), &ctx()).unwrap();
        let image = object.kind.as_image().unwrap();
        assert_eq!((image.natural_width, image.natural_height), (40, 20));
        assert_eq!(image.format, ImageFormat::Png);
        let center = object.center();
        assert!((center.x - 91.0).abs() < 1e-9 && (center.y - 61.0).abs() < 1e-9);
        assert_eq!(object.role, ObjectRole::Content);
    }

    #[test]
    fn test_import_raster_errors() {
        assert!(matches!(
            import_raster(b"GIF89a....", None, &ctx()),
            Err(ImportError::UnsupportedFormat)
        ));
        let mut broken = png(4, 4);
        broken.truncate(20);
        assert!(matches!(
            import_raster(&broken, None, &ctx()),
            Err(ImportError::Raster(_))
        ));
    }

    #[test]
    fn test_vector_scale() {
        let ctx = ctx();
        let small = vector_scale(Size::new(96.0, 96.0), &ctx);
        assert!((small - 50.8 / 96.0).abs() < 1e-9);

        let big = vector_scale(Size::new(960.0, 96.0), &ctx);
        assert!((960.0 * big - 182.0 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_import_svg_single_path() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
            <rect x="10" y="20" width="50" height="30" fill="#ff0000"/>
        </svg>"##;
        let object = import_svg(svg, &ctx()).unwrap();
        let ObjectKind::Path(vector) = &object.kind else {
            panic!("expected a path, got {}", object.kind.kind_name());
        };
        let local = vector.path.bounding_box();
        assert!(local.x0.abs() < 1e-6 && local.y0.abs() < 1e-6);
        assert!((local.width() - 50.0).abs() < 1e-6);
        assert_eq!(object.style.fill, Some(SerializableColor::new(255, 0, 0, 255)));
        assert!((object.scale_x - 50.8 / 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_import_svg_groups_multiple_paths() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
            <rect x="0" y="0" width="10" height="10" fill="black"/>
            <circle cx="50" cy="50" r="10" fill="none" stroke="blue" stroke-width="2"/>
        </svg>"##;
        let object = import_svg(svg, &ctx()).unwrap();
        let group = object.kind.as_group().expect("group");
        assert_eq!(group.len(), 2);
        assert!(group.children[1].style.fill.is_none());
        assert_eq!(
            group.children[1].style.stroke,
            Some(SerializableColor::new(0, 0, 255, 255))
        );
    }

    #[test]
    fn test_import_svg_errors() {
        assert!(matches!(import_svg("<not svg", &ctx()), Err(ImportError::Svg(_))));
        let empty = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;
        assert!(matches!(import_svg(empty, &ctx()), Err(ImportError::EmptyVector)));
    }

    #[test]
    fn test_import_scene_json_keeps_content_only() {
        let content = SceneObject::new(ObjectKind::Rect(crate::objects::Rectangle::new(5.0, 5.0)));
        let guide = content
            .clone()
            .with_role(ObjectRole::System(crate::objects::SystemKind::TrimGuide));
        let state = SceneState {
            version: crate::scene::SCENE_VERSION,
            display_dpi: 101.6,
            objects: vec![content.at(10.0, 10.0), guide],
        };
        let json = state.to_json().unwrap();
        let objects = import_scene_json(&json, 50.8).unwrap();
        assert_eq!(objects.len(), 1);
        assert!((objects[0].left - 5.0).abs() < 1e-9);
        assert!(matches!(import_scene_json("[]", 50.8), Err(ImportError::Json(_))));
    }
}
