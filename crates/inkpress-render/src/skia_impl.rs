//! CPU raster backend built on tiny-skia.

use crate::fonts::FontResolver;
use crate::renderer::{RasterBuffer, RenderContext, RenderError, RenderResult, Renderer};
use inkpress_core::objects::{Image, Text, TextAlign};
use inkpress_core::{ObjectId, ObjectKind, ObjectStyle, SceneObject, SerializableColor};
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape as KurboShape};
use rusttype::{OutlineBuilder, Scale, point as rt_point};
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};
use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    StrokeDash, Transform,
};

fn placeholder_fill() -> SerializableColor {
    SerializableColor::new(200, 200, 200, 255)
}

fn placeholder_stroke() -> SerializableColor {
    SerializableColor::new(120, 120, 120, 255)
}

/// tiny-skia renderer for scenes.
pub struct SkiaRenderer {
    /// Font source for text. `None` uses the shared system resolver.
    fonts: Option<Arc<FontResolver>>,
    /// Decoded images by object id and payload hash. `None` records a decode failure.
    image_cache: Mutex<HashMap<(ObjectId, u64), Option<Arc<Pixmap>>>>,
}

impl Default for SkiaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkiaRenderer {
    pub fn new() -> Self {
        Self {
            fonts: None,
            image_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Use a specific font resolver instead of the system one.
    pub fn with_fonts(mut self, fonts: Arc<FontResolver>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    fn fonts(&self) -> &FontResolver {
        self.fonts.as_deref().unwrap_or_else(|| FontResolver::shared())
    }

    /// Forget decoded images.
    pub fn clear_image_cache(&self) {
        self.image_cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    fn render_object(
        &self,
        pixmap: &mut Pixmap,
        object: &SceneObject,
        parent: Affine,
        parent_opacity: f64,
        honor_export_flag: bool,
    ) {
        if !object.visible || (honor_export_flag && object.exclude_from_export) {
            return;
        }
        let transform = parent * object.transform();
        let opacity = (parent_opacity * object.style.opacity).clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }

        match &object.kind {
            ObjectKind::Group(group) => {
                for child in &group.children {
                    self.render_object(pixmap, child, transform, opacity, honor_export_flag);
                }
            }
            ObjectKind::Image(image) => {
                self.render_image(pixmap, object.id(), image, &object.style, transform, opacity)
            }
            ObjectKind::Text(text) => {
                let bounds = object.kind.local_bounds();
                self.render_text(pixmap, text, bounds, &object.style, transform, opacity)
            }
            kind => render_path(pixmap, &kind.to_path(), &object.style, transform, opacity),
        }
    }

    fn decoded(&self, id: ObjectId, image: &Image) -> Option<Arc<Pixmap>> {
        let mut hasher = DefaultHasher::new();
        image.data_base64.hash(&mut hasher);
        let key = (id, hasher.finish());

        let mut cache = self.image_cache.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
        // Entries for older payloads of this object are dead.
        cache.retain(|(cached, _), _| *cached != id);
        let decoded = decode_pixmap(image).map(Arc::new);
        if decoded.is_none() {
            log::warn!("Image {id} could not be decoded, drawing placeholder");
        }
        cache.insert(key, decoded.clone());
        decoded
    }

    fn render_image(
        &self,
        pixmap: &mut Pixmap,
        id: ObjectId,
        image: &Image,
        style: &ObjectStyle,
        transform: Affine,
        opacity: f64,
    ) {
        let Some(decoded) = self.decoded(id, image) else {
            render_image_placeholder(pixmap, image, transform, opacity);
            return;
        };

        let sx = image.natural_width as f64 / decoded.width() as f64;
        let sy = image.natural_height as f64 / decoded.height() as f64;
        let image_transform = transform * Affine::scale_non_uniform(sx, sy);
        let paint = PixmapPaint {
            opacity: opacity as f32,
            quality: FilterQuality::Bicubic,
            ..Default::default()
        };
        let source: &Pixmap = &decoded;
        pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, to_skia(image_transform), None);

        // Images may carry an outline.
        if style.stroke.is_some() && style.stroke_width > 0.0 {
            let frame = ObjectStyle {
                fill: None,
                ..style.clone()
            };
            let bounds = Rect::new(0.0, 0.0, image.natural_width as f64, image.natural_height as f64);
            render_path(pixmap, &bounds.to_path(0.1), &frame, transform, opacity);
        }
    }

    fn render_text(
        &self,
        pixmap: &mut Pixmap,
        text: &Text,
        bounds: Rect,
        style: &ObjectStyle,
        transform: Affine,
        opacity: f64,
    ) {
        if text.content.trim().is_empty() {
            return;
        }
        let Some(font) = self
            .fonts()
            .resolve_or_fallback(&text.font_family, text.font_weight, text.italic)
        else {
            log::warn!("No font available for '{}', text skipped", text.font_family);
            return;
        };

        let scale = Scale::uniform(text.font_size as f32);
        let ascent = font.v_metrics(scale).ascent as f64;
        let advance = text.font_size * text.line_height;

        let mut outline = GlyphOutline::default();
        for (index, line) in text.lines().enumerate() {
            let glyphs: Vec<_> = font.layout(line, scale, rt_point(0.0, 0.0)).collect();
            let width = glyphs
                .last()
                .map(|g| (g.position().x + g.unpositioned().h_metrics().advance_width) as f64)
                .unwrap_or(0.0);
            let x = match text.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (bounds.width() - width) / 2.0,
                TextAlign::Right => bounds.width() - width,
            };
            let baseline = index as f64 * advance + ascent;

            for glyph in &glyphs {
                outline.origin = Point::new(x + glyph.position().x as f64, baseline);
                glyph.unpositioned().build_outline(&mut outline);
            }
        }

        render_path(pixmap, &outline.path, style, transform, opacity);
    }
}

impl Renderer for SkiaRenderer {
    fn render(&self, ctx: &RenderContext) -> RenderResult<RasterBuffer> {
        let (width, height) = ctx.output_size()?;
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidSize {
            width: width as f64,
            height: height as f64,
        })?;

        let bg = ctx.background.to_rgba8();
        pixmap.fill(Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));

        let base = Affine::scale(ctx.multiplier);
        for object in ctx.scene.ordered() {
            self.render_object(&mut pixmap, object, base, 1.0, ctx.honor_export_flag);
        }

        log::debug!(
            "Rendered {} objects to {}x{} at {:.3}x",
            ctx.scene.len(),
            width,
            height,
            ctx.multiplier
        );

        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(RasterBuffer::new(rgba, width, height))
    }
}

/// Collects glyph outlines into one path, offset to the current glyph origin.
#[derive(Default)]
struct GlyphOutline {
    path: BezPath,
    origin: Point,
}

impl GlyphOutline {
    fn at(&self, x: f32, y: f32) -> Point {
        Point::new(self.origin.x + x as f64, self.origin.y + y as f64)
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.at(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.at(x, y);
        self.path.line_to(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (c, p) = (self.at(x1, y1), self.at(x, y));
        self.path.quad_to(c, p);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1, c2, p) = (self.at(x1, y1), self.at(x2, y2), self.at(x, y));
        self.path.curve_to(c1, c2, p);
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

fn to_skia(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn paint_for(color: SerializableColor, opacity: f64) -> Paint<'static> {
    let alpha = (color.a as f64 * opacity).round().clamp(0.0, 255.0) as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, alpha);
    paint.anti_alias = true;
    paint
}

fn stroke_for(style: &ObjectStyle) -> Stroke {
    let mut stroke = Stroke {
        width: style.stroke_width as f32,
        ..Default::default()
    };
    if !style.stroke_dash.is_empty() {
        let mut dashes: Vec<f32> = style.stroke_dash.iter().map(|d| *d as f32).collect();
        // An odd dash list repeats once, as in SVG.
        if dashes.len() % 2 == 1 {
            dashes.extend_from_within(..);
        }
        stroke.dash = StrokeDash::new(dashes, 0.0);
    }
    stroke
}

fn render_path(pixmap: &mut Pixmap, path: &BezPath, style: &ObjectStyle, transform: Affine, opacity: f64) {
    let Some(skia_path) = to_skia_path(path) else {
        return;
    };
    let ts = to_skia(transform);

    if let Some(fill) = style.fill {
        pixmap.fill_path(&skia_path, &paint_for(fill, opacity), FillRule::Winding, ts, None);
    }
    if let Some(stroke_color) = style.stroke.filter(|_| style.stroke_width > 0.0) {
        pixmap.stroke_path(&skia_path, &paint_for(stroke_color, opacity), &stroke_for(style), ts, None);
    }
}

fn render_image_placeholder(pixmap: &mut Pixmap, image: &Image, transform: Affine, opacity: f64) {
    let bounds = Rect::new(0.0, 0.0, image.natural_width as f64, image.natural_height as f64);
    let width = (bounds.width().min(bounds.height()) / 50.0).max(1.0);

    let mut cross = BezPath::new();
    cross.move_to(Point::new(bounds.x0, bounds.y0));
    cross.line_to(Point::new(bounds.x1, bounds.y1));
    cross.move_to(Point::new(bounds.x1, bounds.y0));
    cross.line_to(Point::new(bounds.x0, bounds.y1));

    let frame = ObjectStyle {
        fill: Some(placeholder_fill()),
        stroke: Some(placeholder_stroke()),
        stroke_width: width,
        ..Default::default()
    };
    render_path(pixmap, &bounds.to_path(0.1), &frame, transform, opacity);
    render_path(
        pixmap,
        &cross,
        &ObjectStyle::outline(placeholder_stroke(), width),
        transform,
        opacity,
    );
}

fn decode_pixmap(image: &Image) -> Option<Pixmap> {
    let bytes = image.data()?;
    let decoded = ::image::load_from_memory(&bytes).ok()?.to_rgba8();
    let (width, height) = decoded.dimensions();

    let mut data = decoded.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
    }
    Pixmap::from_vec(data, IntSize::from_wh(width, height)?)
}
