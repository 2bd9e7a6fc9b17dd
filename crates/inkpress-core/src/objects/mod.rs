//! Scene object definitions for the print editor.

mod circle;
mod group;
mod image;
mod line;
mod patch;
mod path;
mod rectangle;
mod text;

pub use circle::Circle;
pub use group::Group;
pub use image::{Image, ImageFormat};
pub use line::Line;
pub use patch::ObjectPatch;
pub use path::VectorPath;
pub use rectangle::Rectangle;
pub use text::{FontWeight, Text, TextAlign};

use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Print-production magenta used for cut lines.
    pub fn magenta() -> Self {
        Self::new(255, 0, 255, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok().map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

        match hex.len() {
            3 => Some(Self::new(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
            6 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Multiply the alpha channel by `opacity`.
    pub fn with_opacity(&self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..*self }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Paint properties shared by every object kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStyle {
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill: Option<SerializableColor>,
    /// Stroke color (None = no stroke).
    #[serde(default)]
    pub stroke: Option<SerializableColor>,
    /// Stroke width in local units.
    #[serde(default)]
    pub stroke_width: f64,
    /// Dash pattern in local units. Empty for a solid stroke.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stroke_dash: Vec<f64>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for ObjectStyle {
    fn default() -> Self {
        Self {
            fill: Some(SerializableColor::black()),
            stroke: None,
            stroke_width: 0.0,
            stroke_dash: Vec::new(),
            opacity: 1.0,
        }
    }
}

impl ObjectStyle {
    /// Outline-only style.
    pub fn outline(color: SerializableColor, width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            stroke_width: width,
            ..Self::default()
        }
    }

    /// Fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<SerializableColor> {
        self.fill.map(|c| c.with_opacity(self.opacity))
    }

    /// Stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Option<SerializableColor> {
        self.stroke.map(|c| c.with_opacity(self.opacity))
    }
}

/// Page-structure objects installed by the editor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    /// White sheet covering the bleed box.
    Background,
    /// Outline of the finished page edge.
    TrimGuide,
    /// Outline of the safe zone.
    SafeGuide,
}

/// Orientation of a ruler guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideAxis {
    /// A line at a fixed y, spanning the pasteboard width.
    Horizontal,
    /// A line at a fixed x, spanning the pasteboard height.
    Vertical,
}

/// What part an object plays in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRole {
    /// User content that is printed.
    #[default]
    Content,
    /// Page structure installed by the editor.
    System(SystemKind),
    /// User-placed measuring guide.
    RulerGuide(GuideAxis),
    /// Non-printing reference image placed over the content.
    TemplateOverlay,
    /// Die-cut outline handed to the cutter, never rasterized.
    CutContour,
}

/// Z-order stratum. Objects of a lower band always paint below a higher band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Background = 0,
    Content = 1,
    Overlay = 2,
    Guide = 3,
}

impl ObjectRole {
    /// The z-band this role is pinned to.
    pub fn band(&self) -> Band {
        match self {
            ObjectRole::System(SystemKind::Background) => Band::Background,
            ObjectRole::Content => Band::Content,
            ObjectRole::TemplateOverlay | ObjectRole::CutContour => Band::Overlay,
            ObjectRole::System(_) | ObjectRole::RulerGuide(_) => Band::Guide,
        }
    }

    /// Whether this is user content.
    pub fn is_content(&self) -> bool {
        matches!(self, ObjectRole::Content)
    }

    /// Whether this object is installed and owned by the editor.
    pub fn is_system(&self) -> bool {
        matches!(self, ObjectRole::System(_))
    }

    /// Whether this role is dropped from raster export by default.
    pub fn is_non_printing(&self) -> bool {
        !matches!(
            self,
            ObjectRole::Content | ObjectRole::System(SystemKind::Background)
        )
    }
}

/// Kind-specific geometry of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Text(Text),
    Image(Image),
    Rect(Rectangle),
    Circle(Circle),
    Line(Line),
    Path(VectorPath),
    Group(Group),
}

/// Local-space behaviour shared by all object kinds.
pub trait ObjectBody {
    /// Bounding box in the object's local coordinate space.
    fn local_bounds(&self) -> Rect;

    /// Outline in local space.
    fn to_path(&self) -> BezPath;

    /// Check if a local-space point hits this body.
    fn hit_test(&self, point: Point, tolerance: f64, style: &ObjectStyle) -> bool;
}

/// Distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

impl ObjectKind {
    fn body(&self) -> &dyn ObjectBody {
        match self {
            ObjectKind::Text(t) => t,
            ObjectKind::Image(i) => i,
            ObjectKind::Rect(r) => r,
            ObjectKind::Circle(c) => c,
            ObjectKind::Line(l) => l,
            ObjectKind::Path(p) => p,
            ObjectKind::Group(g) => g,
        }
    }

    /// Short name of the kind, as shown in the layer list.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ObjectKind::Text(_) => "text",
            ObjectKind::Image(_) => "image",
            ObjectKind::Rect(_) => "rect",
            ObjectKind::Circle(_) => "circle",
            ObjectKind::Line(_) => "line",
            ObjectKind::Path(_) => "path",
            ObjectKind::Group(_) => "group",
        }
    }

    /// Bounding box in local space.
    pub fn local_bounds(&self) -> Rect {
        self.body().local_bounds()
    }

    /// Intrinsic (unscaled) size.
    pub fn local_size(&self) -> Size {
        self.local_bounds().size()
    }

    /// Outline in local space.
    pub fn to_path(&self) -> BezPath {
        self.body().to_path()
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            ObjectKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            ObjectKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            ObjectKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            ObjectKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            ObjectKind::Image(i) => Some(i),
            _ => None,
        }
    }
}

fn yes() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

/// A placeable object in the scene.
///
/// Placement is top-left anchored: the local origin of the kind sits at
/// (`left`, `top`), rotated by `angle` degrees and then scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub(crate) id: ObjectId,
    /// Role in the document. Decides z-band and export behaviour.
    #[serde(default)]
    pub role: ObjectRole,
    /// User-visible name.
    #[serde(default)]
    pub name: String,
    /// X position of the local origin in document px.
    pub left: f64,
    /// Y position of the local origin in document px.
    pub top: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Rotation in degrees, clockwise, about the local origin.
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub style: ObjectStyle,
    #[serde(default = "yes")]
    pub visible: bool,
    /// Locked objects keep their placement.
    #[serde(default)]
    pub locked: bool,
    /// Derived from role, lock state and active tool. Not persisted.
    #[serde(skip, default = "yes")]
    pub selectable: bool,
    /// Derived from role, lock state and active tool. Not persisted.
    #[serde(skip, default = "yes")]
    pub evented: bool,
    /// Skipped by raster export.
    #[serde(default)]
    pub exclude_from_export: bool,
    /// Kind-specific geometry.
    pub kind: ObjectKind,
}

impl SceneObject {
    /// Create a content object at the origin. The id is assigned when the object
    /// is added to a scene.
    pub fn new(kind: ObjectKind) -> Self {
        let name = kind.kind_name().to_string();
        Self {
            id: Uuid::nil(),
            role: ObjectRole::Content,
            name,
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            style: ObjectStyle::default(),
            visible: true,
            locked: false,
            selectable: true,
            evented: true,
            exclude_from_export: false,
            kind,
        }
    }

    /// Builder: place the local origin.
    pub fn at(mut self, left: f64, top: f64) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    /// Builder: set the style.
    pub fn with_style(mut self, style: ObjectStyle) -> Self {
        self.style = style;
        self
    }

    /// Builder: set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set a uniform scale.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale_x = scale;
        self.scale_y = scale;
        self
    }

    /// Builder: assign a role and apply its defaults.
    pub fn with_role(mut self, role: ObjectRole) -> Self {
        self.set_role(role);
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Assign a role and apply the role's default appearance and flags.
    pub fn set_role(&mut self, role: ObjectRole) {
        self.role = role;
        match role {
            ObjectRole::Content => {
                self.exclude_from_export = false;
            }
            ObjectRole::System(_) => {
                self.locked = true;
                self.exclude_from_export = true;
            }
            ObjectRole::RulerGuide(_) => {
                self.exclude_from_export = true;
            }
            ObjectRole::TemplateOverlay => {
                self.locked = true;
                self.style.opacity = 0.5;
                self.exclude_from_export = true;
            }
            ObjectRole::CutContour => {
                self.style.fill = None;
                self.style.stroke = Some(SerializableColor::magenta());
                if self.style.stroke_width <= 0.0 {
                    self.style.stroke_width = 1.0;
                }
                self.style.stroke_dash = vec![6.0, 3.0];
                self.exclude_from_export = true;
            }
        }
        self.derive_interaction();
    }

    /// Recompute `selectable`/`evented` from the role and lock state.
    ///
    /// Content is left interactive here; the active tool narrows it further.
    pub fn derive_interaction(&mut self) {
        let interactive = match self.role {
            ObjectRole::Content => true,
            ObjectRole::System(_) => false,
            // Guides are dragged along their axis.
            ObjectRole::RulerGuide(_) => true,
            ObjectRole::TemplateOverlay | ObjectRole::CutContour => !self.locked,
        };
        self.selectable = interactive;
        self.evented = interactive;
    }

    /// Give this object and all nested children fresh ids.
    pub(crate) fn regenerate_ids(&mut self) {
        self.id = Uuid::new_v4();
        if let ObjectKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.regenerate_ids();
            }
        }
    }

    /// Local-to-document transform.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.left, self.top))
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Axis-aligned bounds in document px.
    pub fn bounds(&self) -> Rect {
        self.transform().transform_rect_bbox(self.kind.local_bounds())
    }

    /// Scaled size, ignoring rotation.
    pub fn scaled_size(&self) -> Size {
        let size = self.kind.local_size();
        Size::new(size.width * self.scale_x.abs(), size.height * self.scale_y.abs())
    }

    /// Center of the bounds.
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Move so that the bounds are centered on `center`.
    pub fn center_on(&mut self, center: Point) {
        let delta = center - self.center();
        self.translate(delta);
    }

    /// Move by a delta.
    pub fn translate(&mut self, delta: Vec2) {
        self.left += delta.x;
        self.top += delta.y;
    }

    /// Outline in document px.
    pub fn world_path(&self) -> BezPath {
        let mut path = self.kind.to_path();
        path.apply_affine(self.transform());
        path
    }

    /// Check if a document-space point hits this object.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let transform = self.transform();
        if transform.determinant().abs() < f64::EPSILON {
            return false;
        }
        let local = transform.inverse() * point;
        let scale = self.scale_x.abs().max(self.scale_y.abs()).max(f64::EPSILON);
        self.kind.body().hit_test(local, tolerance / scale, &self.style)
    }

    /// Check if this object is a text object.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text(_))
    }
}
