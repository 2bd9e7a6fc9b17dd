//! Editor session: the single owner of page, scene, history and tool state.
//!
//! Every mutation enters through `&mut Editor`. Committed mutations take one
//! history snapshot and queue [`EditorEvent`]s that the host drains with
//! [`Editor::drain_events`].

use crate::config::EditorConfig;
use crate::document::DesignDocument;
use crate::fonts::{FALLBACK_FONT_FAMILY, FontLoader, FontRequest, FontResolution, PendingFonts};
use crate::history::{History, Snapshot};
use crate::import::{self, ImportContext, ImportError};
use crate::objects::{
    Circle, GuideAxis, Group, Line, ObjectId, ObjectKind, ObjectPatch, ObjectRole, ObjectStyle,
    Rectangle, SceneObject, SerializableColor, SystemKind, Text, VectorPath,
};
use crate::scene::{Direction, LayerDescriptor, Scene, SceneError, SceneState};
use crate::tools::{Placement, ToolKind, ToolManager};
use crate::units::{GeometryError, PageBoxes, PageSpec, compute_page_boxes};
use crate::viewport::{DisplayConfig, Viewport};
use kurbo::{Point, Rect, RoundedRect, Shape as KurboShape, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Font size of newly added text, in points.
pub const DEFAULT_TEXT_SIZE_PT: f64 = 14.0;

/// Side of a rectangle placed with a click, in millimeters.
const DEFAULT_SHAPE_MM: f64 = 20.0;

/// Length of a line placed with a click, in millimeters.
const DEFAULT_LINE_MM: f64 = 40.0;

/// Pointer hit tolerance in viewport px.
const HIT_TOLERANCE_PX: f64 = 4.0;

/// Ruler guide label height in millimeters.
const GUIDE_LABEL_MM: f64 = 2.5;

const SHAPE_FILL: SerializableColor = SerializableColor::new(204, 204, 204, 255);
const TRIM_COLOR: SerializableColor = SerializableColor::new(230, 40, 40, 255);
const SAFE_COLOR: SerializableColor = SerializableColor::new(0, 160, 80, 255);
const GUIDE_COLOR: SerializableColor = SerializableColor::new(0, 170, 255, 255);

/// Notifications queued for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    /// The scene was changed and a history entry taken (or restored).
    SceneChanged,
    /// Fresh layer projection, topmost first.
    LayersChanged(Vec<LayerDescriptor>),
    SelectionChanged(Vec<ObjectId>),
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// A requested font could not be loaded and the fallback family was used.
    FontFallback { object_id: ObjectId, requested: String },
    /// The whole document was loaded or its page replaced.
    DocumentReplaced,
    ToolChanged(ToolKind),
    /// The image tool was used; the host should pick a file and call `add_image`.
    ImageRequested { anchor: Point },
}

/// Category of a failure, for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    InvalidGeometry,
    DecodeFailed,
    InvalidDocument,
    NotFound,
}

/// Errors raised by editor operations.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("object {0} not found")]
    NotFound(ObjectId),
}

impl EditorError {
    pub fn reason(&self) -> FailureReason {
        match self {
            EditorError::Geometry(_) => FailureReason::InvalidGeometry,
            EditorError::Scene(_) => FailureReason::InvalidDocument,
            EditorError::Import(ImportError::Json(_)) => FailureReason::InvalidDocument,
            EditorError::Import(_) => FailureReason::DecodeFailed,
            EditorError::NotFound(_) => FailureReason::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    last: Point,
    moved: bool,
}

/// An editing session over one page.
pub struct Editor {
    page: PageSpec,
    config: EditorConfig,
    viewport: Viewport,
    boxes: PageBoxes,
    scene: Scene,
    history: History,
    tools: ToolManager,
    selection: Vec<ObjectId>,
    fonts: PendingFonts,
    events: Vec<EditorEvent>,
    drag: Option<DragState>,
    /// Live edits not yet committed.
    interaction_dirty: bool,
    /// Set while a history snapshot is being restored.
    restoring: bool,
}

impl Editor {
    /// Start a session on a blank page.
    pub fn new(page: PageSpec, config: EditorConfig) -> Result<Self, EditorError> {
        page.validate()?;
        config.validate()?;

        let viewport = Viewport::new(&page, &config);
        let boxes = compute_page_boxes(&page, viewport.effective_dpi());
        let mut editor = Self {
            page,
            history: History::new(config.history_capacity),
            config,
            viewport,
            boxes,
            scene: Scene::new(),
            tools: ToolManager::new(),
            selection: Vec::new(),
            fonts: PendingFonts::new(),
            events: Vec::new(),
            drag: None,
            interaction_dirty: false,
            restoring: false,
        };
        editor.install_system_objects();
        editor.reset_history();
        log::info!(
            "Editor ready: {}x{} mm page, bleed {} mm, {} dpi display",
            page.width_mm,
            page.height_mm,
            page.bleed_mm,
            editor.display_dpi()
        );
        Ok(editor)
    }

    /// Start a session from a stored document.
    pub fn open(document: &DesignDocument, config: EditorConfig) -> Result<Self, EditorError> {
        let mut editor = Self::new(document.page, config)?;
        let json = document.scene.to_json().map_err(SceneError::from)?;
        editor.load_json(&json)?;
        Ok(editor)
    }

    /// Package the current state as a document.
    pub fn to_document(&self, name: impl Into<String>) -> DesignDocument {
        DesignDocument::new(name, self.page, self.scene.serialize(self.display_dpi()))
    }

    pub fn page(&self) -> &PageSpec {
        &self.page
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Bleed, trim and safe boxes in document px.
    pub fn boxes(&self) -> &PageBoxes {
        &self.boxes
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Effective display DPI of the document surface.
    pub fn display_dpi(&self) -> f64 {
        self.viewport.effective_dpi()
    }

    pub fn display_config(&self) -> DisplayConfig {
        self.viewport.display_config()
    }

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current_tool()
    }

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    /// Take the queued events.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Persistence ---

    /// Serialize the scene.
    pub fn get_json(&self) -> Result<String, EditorError> {
        Ok(self
            .scene
            .serialize(self.display_dpi())
            .to_json()
            .map_err(SceneError::from)?)
    }

    /// Replace the scene with a serialized one and reset history.
    ///
    /// Coordinates are rescaled from the stored display DPI. System objects are
    /// rebuilt for the current page.
    pub fn load_json(&mut self, json: &str) -> Result<(), EditorError> {
        let state = SceneState::from_json(json)?;
        log::info!("Loading scene with {} objects", state.objects.len());
        self.replace_scene(state);
        self.finish_document_replace();
        Ok(())
    }

    /// Append the content of another serialized scene.
    pub fn import_json(&mut self, json: &str) -> Result<Vec<ObjectId>, EditorError> {
        let objects = import::import_scene_json(json, self.display_dpi())?;
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<ObjectId> = objects
            .into_iter()
            .map(|object| self.scene.add_object(object))
            .collect();
        log::info!("Imported {} objects from JSON", ids.len());
        self.tools.apply_interactivity(&mut self.scene);
        self.commit();
        self.set_selection(ids.clone());
        Ok(ids)
    }

    /// Import SVG artwork as one path or a group of paths.
    pub fn import_svg(&mut self, svg: &str) -> Result<ObjectId, EditorError> {
        let object = import::import_svg(svg, &self.import_context())?;
        Ok(self.insert_selected(object))
    }

    /// Change the page. Content and ruler guides are kept; page-bound overlays
    /// (template, cut contour) are dropped; history is reset.
    pub fn replace_page(&mut self, page: PageSpec) -> Result<(), EditorError> {
        page.validate()?;

        let old_dpi = self.display_dpi();
        let state = self.scene.serialize(old_dpi);
        let guides: Vec<(GuideAxis, f64)> = self.scene.ordered().filter_map(guide_position).collect();
        let dropped = self
            .scene
            .ids_where(|role| matches!(role, ObjectRole::TemplateOverlay | ObjectRole::CutContour));
        if !dropped.is_empty() {
            log::info!("Dropping {} page-bound overlays on page change", dropped.len());
        }

        let viewport_size = self.viewport.viewport_size();
        let zoom = self.viewport.zoom();
        self.page = page;
        self.viewport = Viewport::new(&page, &self.config);
        self.viewport
            .set_viewport_size(viewport_size.width, viewport_size.height);
        self.viewport.set_zoom(zoom);
        self.boxes = compute_page_boxes(&page, self.display_dpi());

        let mut content = state;
        content.objects.retain(|o| o.role.is_content());
        self.replace_scene(content);

        let factor = self.display_dpi() / old_dpi;
        for (axis, position) in guides {
            let guide = self.guide_object(axis, position * factor);
            self.scene.add_object(guide);
        }
        log::info!(
            "Page replaced: {}x{} mm, bleed {} mm",
            page.width_mm,
            page.height_mm,
            page.bleed_mm
        );
        self.finish_document_replace();
        Ok(())
    }

    fn replace_scene(&mut self, mut state: SceneState) {
        state.rescale_to(self.display_dpi());
        state.objects.retain(|o| !o.role.is_system());
        self.scene.deserialize(state);
        self.install_system_objects();
        self.tools.cancel();
        self.tools.apply_interactivity(&mut self.scene);
        self.fonts.clear();
        self.drag = None;
        self.interaction_dirty = false;
    }

    fn finish_document_replace(&mut self) {
        self.reset_history();
        self.set_selection(Vec::new());
        self.events.push(EditorEvent::DocumentReplaced);
        self.notify_scene_changed();
    }

    fn install_system_objects(&mut self) {
        for kind in [SystemKind::Background, SystemKind::TrimGuide, SystemKind::SafeGuide] {
            while let Some(id) = self.scene.find_system(kind) {
                self.scene.remove_object(id);
            }
        }

        let PageBoxes { bleed, trim, safe } = self.boxes;
        let background = SceneObject::new(ObjectKind::Rect(Rectangle::new(
            bleed.width(),
            bleed.height(),
        )))
        .at(bleed.x0, bleed.y0)
        .with_style(ObjectStyle {
            fill: Some(SerializableColor::white()),
            ..ObjectStyle::default()
        })
        .with_name("Background")
        .with_role(ObjectRole::System(SystemKind::Background));

        let trim_guide = SceneObject::new(ObjectKind::Rect(Rectangle::new(trim.width(), trim.height())))
            .at(trim.x0, trim.y0)
            .with_style(ObjectStyle::outline(TRIM_COLOR, 1.0))
            .with_name("Trim")
            .with_role(ObjectRole::System(SystemKind::TrimGuide));

        let safe_guide = SceneObject::new(ObjectKind::Rect(Rectangle::new(safe.width(), safe.height())))
            .at(safe.x0, safe.y0)
            .with_style(ObjectStyle {
                stroke_dash: vec![4.0, 4.0],
                ..ObjectStyle::outline(SAFE_COLOR, 1.0)
            })
            .with_name("Safe area")
            .with_role(ObjectRole::System(SystemKind::SafeGuide));

        self.scene.add_object(background);
        self.scene.add_object(trim_guide);
        self.scene.add_object(safe_guide);
    }

    // --- History ---

    fn snapshot(&self) -> Result<Snapshot, EditorError> {
        self.get_json().map(Snapshot::from)
    }

    fn reset_history(&mut self) {
        match self.snapshot() {
            Ok(snapshot) => self.history.reset(snapshot),
            Err(e) => log::error!("Failed to snapshot scene: {e}"),
        }
    }

    /// Take a history entry for the current scene and notify the host.
    fn commit(&mut self) {
        if self.restoring {
            return;
        }
        match self.snapshot() {
            Ok(snapshot) => self.history.commit(snapshot),
            Err(e) => {
                log::error!("Failed to snapshot scene: {e}");
                return;
            }
        }
        self.interaction_dirty = false;
        self.notify_scene_changed();
    }

    fn notify_scene_changed(&mut self) {
        self.events.push(EditorEvent::SceneChanged);
        self.events
            .push(EditorEvent::LayersChanged(self.scene.list_layers()));
        self.events.push(EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    /// Restore the previous snapshot. Returns false at the start of history.
    ///
    /// A drag still in progress is committed first, so undo reverts it.
    pub fn undo(&mut self) -> bool {
        self.commit_interaction();
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.restore(&snapshot)
    }

    /// Restore the next snapshot. Returns false at the end of history.
    pub fn redo(&mut self) -> bool {
        self.commit_interaction();
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.restore(&snapshot)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restore(&mut self, snapshot: &str) -> bool {
        self.restoring = true;
        let result = SceneState::from_json(snapshot);
        let restored = match result {
            Ok(state) => {
                self.scene.deserialize(state);
                self.tools.apply_interactivity(&mut self.scene);
                true
            }
            Err(e) => {
                log::error!("Corrupt history snapshot: {e}");
                false
            }
        };
        self.restoring = false;
        if restored {
            self.drag = None;
            self.interaction_dirty = false;
            let kept: Vec<ObjectId> = self
                .selection
                .iter()
                .copied()
                .filter(|id| self.scene.get(*id).is_some_and(|o| o.selectable))
                .collect();
            self.set_selection(kept);
            self.notify_scene_changed();
        }
        restored
    }

    // --- Adding objects ---

    fn import_context(&self) -> ImportContext {
        ImportContext {
            display_dpi: self.display_dpi(),
            print_dpi: self.page.dpi,
            document_size: self.viewport.document_size(),
        }
    }

    fn document_center(&self) -> Point {
        self.boxes.bleed.center()
    }

    fn default_text_size(&self) -> f64 {
        DEFAULT_TEXT_SIZE_PT / 72.0 * self.display_dpi()
    }

    /// Add a content object, select it and commit.
    fn insert_selected(&mut self, object: SceneObject) -> ObjectId {
        let id = self.scene.add_object(object);
        self.tools.apply_interactivity(&mut self.scene);
        self.commit();
        self.set_selection(vec![id]);
        id
    }

    /// Add text centered on the document.
    pub fn add_text(&mut self, content: &str) -> ObjectId {
        let mut object = SceneObject::new(ObjectKind::Text(Text::new(content, self.default_text_size())));
        object.center_on(self.document_center());
        self.insert_selected(object)
    }

    /// Add text with its top-left corner at `anchor`.
    pub fn add_text_at(&mut self, anchor: Point, content: &str) -> ObjectId {
        let object = SceneObject::new(ObjectKind::Text(Text::new(content, self.default_text_size())))
            .at(anchor.x, anchor.y);
        self.insert_selected(object)
    }

    /// Decode and add a raster image, centered.
    pub fn add_image(&mut self, bytes: &[u8], source_dpi: Option<f64>) -> Result<ObjectId, EditorError> {
        let object = import::import_raster(bytes, source_dpi, &self.import_context())?;
        Ok(self.insert_selected(object))
    }

    /// Add a default rectangle centered on the document.
    pub fn add_rectangle(&mut self) -> ObjectId {
        let side = self.viewport.mm_to_px(DEFAULT_SHAPE_MM);
        let center = self.document_center();
        self.insert_selected(self.rectangle_object(Rect::from_center_size(center, (side, side))))
    }

    /// Add a default circle centered on the document.
    pub fn add_circle(&mut self) -> ObjectId {
        let radius = self.viewport.mm_to_px(DEFAULT_SHAPE_MM / 2.0);
        let center = self.document_center();
        self.insert_selected(self.circle_object(center - Vec2::new(radius, radius), radius))
    }

    /// Add a default horizontal line centered on the document.
    pub fn add_line(&mut self) -> ObjectId {
        let half = self.viewport.mm_to_px(DEFAULT_LINE_MM) / 2.0;
        let center = self.document_center();
        self.insert_selected(line_object(
            center - Vec2::new(half, 0.0),
            center + Vec2::new(half, 0.0),
        ))
    }

    fn rectangle_object(&self, rect: Rect) -> SceneObject {
        SceneObject::new(ObjectKind::Rect(Rectangle::new(rect.width(), rect.height())))
            .at(rect.x0, rect.y0)
            .with_style(ObjectStyle {
                fill: Some(SHAPE_FILL),
                ..ObjectStyle::default()
            })
    }

    fn circle_object(&self, origin: Point, radius: f64) -> SceneObject {
        SceneObject::new(ObjectKind::Circle(Circle::new(radius)))
            .at(origin.x, origin.y)
            .with_style(ObjectStyle {
                fill: Some(SHAPE_FILL),
                ..ObjectStyle::default()
            })
    }

    // --- Guides, templates and contours ---

    /// Add a horizontal ruler guide at `y` document px.
    pub fn add_horizontal_guide(&mut self, y: f64) -> ObjectId {
        let guide = self.guide_object(GuideAxis::Horizontal, y);
        let id = self.scene.add_object(guide);
        self.commit();
        id
    }

    /// Add a vertical ruler guide at `x` document px.
    pub fn add_vertical_guide(&mut self, x: f64) -> ObjectId {
        let guide = self.guide_object(GuideAxis::Vertical, x);
        let id = self.scene.add_object(guide);
        self.commit();
        id
    }

    /// Distance label of a guide: from the bottom trim edge for horizontal
    /// guides, from the left trim edge for vertical ones.
    fn guide_label(&self, axis: GuideAxis, position: f64) -> String {
        let px = match axis {
            GuideAxis::Horizontal => self.boxes.trim.y1 - position,
            GuideAxis::Vertical => position - self.boxes.trim.x0,
        };
        format!("{:.1} mm", self.viewport.px_to_mm(px))
    }

    fn guide_object(&self, axis: GuideAxis, position: f64) -> SceneObject {
        let board = self.viewport.pasteboard_rect();
        let trim = self.boxes.trim;
        let label_size = self.viewport.mm_to_px(GUIDE_LABEL_MM);

        let (line, label_at, left, top) = match axis {
            GuideAxis::Horizontal => (
                Line::new(Point::new(board.x0, 0.0), Point::new(board.x1, 0.0)),
                Point::new(trim.x0 + 2.0, -1.3 * label_size),
                0.0,
                position,
            ),
            GuideAxis::Vertical => (
                Line::new(Point::new(0.0, board.y0), Point::new(0.0, board.y1)),
                Point::new(3.0, trim.y0 + 2.0),
                position,
                0.0,
            ),
        };

        let line = SceneObject::new(ObjectKind::Line(line)).with_style(ObjectStyle::outline(GUIDE_COLOR, 1.0));
        let label = SceneObject::new(ObjectKind::Text(Text::new(self.guide_label(axis, position), label_size)))
            .at(label_at.x, label_at.y)
            .with_style(ObjectStyle {
                fill: Some(GUIDE_COLOR),
                ..ObjectStyle::default()
            });

        SceneObject::new(ObjectKind::Group(Group::new(vec![line, label])))
            .at(left, top)
            .with_style(ObjectStyle {
                fill: None,
                ..ObjectStyle::default()
            })
            .with_name(match axis {
                GuideAxis::Horizontal => "Horizontal guide",
                GuideAxis::Vertical => "Vertical guide",
            })
            .with_role(ObjectRole::RulerGuide(axis))
    }

    /// Drag a ruler guide along its axis. The label follows live; call
    /// [`Editor::commit_interaction`] when the drag ends.
    pub fn move_guide(&mut self, id: ObjectId, position: f64) -> bool {
        let Some(axis) = self.scene.get(id).and_then(|o| match o.role {
            ObjectRole::RulerGuide(axis) => Some(axis),
            _ => None,
        }) else {
            return false;
        };
        if !position.is_finite() {
            return false;
        }
        let label = self.guide_label(axis, position);
        let Some(guide) = self.scene.get_mut(id) else {
            return false;
        };
        match axis {
            GuideAxis::Horizontal => guide.top = position,
            GuideAxis::Vertical => guide.left = position,
        }
        if let Some(text) = guide
            .kind
            .as_group_mut()
            .and_then(|g| g.children.iter_mut().find_map(|c| c.kind.as_text_mut()))
        {
            text.content = label;
        }
        self.interaction_dirty = true;
        true
    }

    /// Label text of a ruler guide.
    pub fn guide_label_of(&self, id: ObjectId) -> Option<&str> {
        self.scene
            .get(id)
            .filter(|o| matches!(o.role, ObjectRole::RulerGuide(_)))
            .and_then(|o| o.kind.as_group())
            .and_then(|g| g.children.iter().find_map(|c| c.kind.as_text()))
            .map(|t| t.content.as_str())
    }

    /// Outline the trim box as a cut contour, replacing any existing one.
    pub fn add_cut_contour(&mut self, corner_radius_mm: f64) -> ObjectId {
        for id in self.scene.ids_where(|role| *role == ObjectRole::CutContour) {
            self.scene.remove_object(id);
        }
        let trim = self.boxes.trim;
        let radius = self
            .viewport
            .mm_to_px(corner_radius_mm.max(0.0))
            .min(trim.width().min(trim.height()) / 2.0);
        let outline = RoundedRect::from_rect(Rect::from_origin_size(Point::ZERO, trim.size()), radius)
            .to_path(0.1);
        let contour = SceneObject::new(ObjectKind::Path(VectorPath::new(outline)))
            .at(trim.x0, trim.y0)
            .with_name("Cut contour")
            .with_role(ObjectRole::CutContour);
        let id = self.scene.add_object(contour);
        self.commit();
        id
    }

    /// Show a pre-rasterized page as a non-printing overlay over the bleed box,
    /// replacing any existing one.
    pub fn add_pdf_template(&mut self, bytes: &[u8]) -> Result<ObjectId, EditorError> {
        let mut template = import::import_raster(bytes, None, &self.import_context())?;
        let Some(image) = template.kind.as_image() else {
            return Err(ImportError::UnsupportedFormat.into());
        };
        let size: Size = self.boxes.bleed.size();
        template.scale_x = size.width / image.natural_width as f64;
        template.scale_y = size.height / image.natural_height as f64;
        template.left = self.boxes.bleed.x0;
        template.top = self.boxes.bleed.y0;
        template.name = "Template".to_string();
        template.set_role(ObjectRole::TemplateOverlay);

        for id in self.scene.ids_where(|role| *role == ObjectRole::TemplateOverlay) {
            self.scene.remove_object(id);
        }
        let id = self.scene.add_object(template);
        self.commit();
        Ok(id)
    }

    // --- Selection and editing ---

    fn set_selection(&mut self, ids: Vec<ObjectId>) {
        if ids != self.selection {
            self.selection = ids;
            self.events
                .push(EditorEvent::SelectionChanged(self.selection.clone()));
        }
    }

    /// Select one object if it can be selected.
    pub fn select(&mut self, id: ObjectId) -> bool {
        if !self.scene.get(id).is_some_and(|o| o.selectable) {
            return false;
        }
        self.set_selection(vec![id]);
        true
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Vec::new());
    }

    /// Delete the selected objects. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selection.clone();
        let mut removed = 0;
        for id in ids {
            if self.scene.remove_object(id).is_some() {
                self.fonts.forget(id);
                removed += 1;
            }
        }
        self.set_selection(Vec::new());
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Copy the selected content objects with an offset and fresh ids, and
    /// select the copies.
    pub fn duplicate_selected(&mut self) -> Result<Vec<ObjectId>, EditorError> {
        let offset = Vec2::new(self.config.duplicate_offset_px, self.config.duplicate_offset_px);
        let originals: Vec<&SceneObject> = self
            .scene
            .ordered()
            .filter(|o| o.role.is_content() && self.selection.contains(&o.id()))
            .collect();

        let mut copies = Vec::with_capacity(originals.len());
        for original in originals {
            let value = serde_json::to_value(original).map_err(SceneError::from)?;
            let mut copy: SceneObject = serde_json::from_value(value).map_err(SceneError::from)?;
            copy.translate(offset);
            copies.push(copy);
        }
        if copies.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ObjectId> = copies
            .into_iter()
            .map(|copy| self.scene.add_object(copy))
            .collect();
        log::debug!("Duplicated {} objects", ids.len());
        self.tools.apply_interactivity(&mut self.scene);
        self.commit();
        self.set_selection(ids.clone());
        Ok(ids)
    }

    /// Merge a patch into every selected object.
    ///
    /// Patches that change a text object's font are parked until the host
    /// reports the font loaded; everything else applies now. Returns true if
    /// anything changed or was parked. Ruler guides only take the coordinate of
    /// their own axis.
    pub fn update_selected_props(&mut self, patch: &ObjectPatch) -> bool {
        let mut changed = false;
        let mut parked = false;
        for id in self.selection.clone() {
            let font = self
                .scene
                .get(id)
                .and_then(|o| o.kind.as_text())
                .filter(|_| patch.touches_font())
                .map(|text| {
                    (
                        patch.font_family.clone().unwrap_or_else(|| text.font_family.clone()),
                        patch.font_weight.unwrap_or(text.font_weight),
                        patch.italic.unwrap_or(text.italic),
                    )
                });
            let guide = self.scene.get(id).and_then(guide_position);
            match (font, guide) {
                (Some((family, weight, italic)), _) => {
                    let ticket = self.fonts.park(id, patch.clone(), family, weight, italic);
                    log::debug!("Parked font update {ticket} for {id}");
                    parked = true;
                }
                (None, Some((axis, position))) => {
                    changed |= self.scene.update_object(id, &patch.without_placement());
                    let target = match axis {
                        GuideAxis::Horizontal => patch.top,
                        GuideAxis::Vertical => patch.left,
                    };
                    if let Some(target) = target.filter(|t| *t != position) {
                        changed |= self.move_guide(id, target);
                    }
                }
                (None, None) => changed |= self.scene.update_object(id, patch),
            }
        }
        if changed {
            self.tools.apply_interactivity(&mut self.scene);
            self.commit();
        }
        changed || parked
    }

    /// Translate the selection live. Guides move along their axis only.
    pub fn move_selected(&mut self, delta: Vec2) -> bool {
        let mut moved = false;
        for id in self.selection.clone() {
            let Some(object) = self.scene.get(id) else {
                continue;
            };
            let (guide, locked) = (guide_position(object), object.locked);
            if let Some((axis, position)) = guide {
                let step = match axis {
                    GuideAxis::Horizontal => delta.y,
                    GuideAxis::Vertical => delta.x,
                };
                moved |= self.move_guide(id, position + step);
            } else if !locked {
                if let Some(object) = self.scene.get_mut(id) {
                    object.translate(delta);
                    moved = true;
                }
            }
        }
        if moved {
            self.interaction_dirty = true;
        }
        moved
    }

    /// Commit live edits made by drags. Returns false when nothing was pending.
    pub fn commit_interaction(&mut self) -> bool {
        if !self.interaction_dirty {
            return false;
        }
        self.commit();
        true
    }

    // --- Layers ---

    /// Content objects, topmost first.
    pub fn get_layers(&self) -> Vec<LayerDescriptor> {
        self.scene.list_layers()
    }

    /// Select a content object from the layer list.
    pub fn select_layer(&mut self, id: ObjectId) -> bool {
        if !self.scene.get(id).is_some_and(|o| o.role.is_content()) {
            return false;
        }
        self.set_selection(vec![id]);
        true
    }

    fn reorder_layer(&mut self, id: ObjectId, direction: Direction) -> bool {
        if !self.scene.get(id).is_some_and(|o| o.role.is_content()) {
            return false;
        }
        let moved = self.scene.reorder(id, direction);
        if moved {
            self.commit();
        }
        moved
    }

    /// One step towards the front.
    pub fn move_layer_up(&mut self, id: ObjectId) -> bool {
        self.reorder_layer(id, Direction::Up)
    }

    /// One step towards the back.
    pub fn move_layer_down(&mut self, id: ObjectId) -> bool {
        self.reorder_layer(id, Direction::Down)
    }

    /// Flip a layer's visibility. Returns the new state.
    pub fn toggle_layer_visibility(&mut self, id: ObjectId) -> Option<bool> {
        if !self.scene.get(id).is_some_and(|o| o.role.is_content()) {
            return None;
        }
        let visible = self.scene.toggle_visibility(id)?;
        self.commit();
        Some(visible)
    }

    /// Move the selection to the front of its band.
    pub fn bring_to_front(&mut self) -> bool {
        let mut moved = false;
        for id in self.selection.clone() {
            moved |= self.scene.bring_to_front(id);
        }
        if moved {
            self.commit();
        }
        moved
    }

    /// Move the selection to the back of its band.
    pub fn send_to_back(&mut self) -> bool {
        let mut moved = false;
        for id in self.selection.iter().rev().copied().collect::<Vec<_>>() {
            moved |= self.scene.send_to_back(id);
        }
        if moved {
            self.commit();
        }
        moved
    }

    // --- Tools and pointer ---

    /// Switch tools. Re-entering the current tool is a no-op.
    pub fn set_tool(&mut self, tool: ToolKind) -> bool {
        if !self.tools.set_tool(tool) {
            return false;
        }
        self.drag = None;
        self.tools.apply_interactivity(&mut self.scene);
        if tool != ToolKind::Select {
            let kept: Vec<ObjectId> = self
                .selection
                .iter()
                .copied()
                .filter(|id| self.scene.get(*id).is_some_and(|o| o.selectable))
                .collect();
            self.set_selection(kept);
        }
        self.events.push(EditorEvent::ToolChanged(tool));
        true
    }

    /// Pointer pressed at a viewport point.
    pub fn pointer_down(&mut self, screen_point: Point) {
        let point = self.viewport.screen_to_document(screen_point);
        if self.tools.current_tool() != ToolKind::Select {
            self.tools.begin(point);
            return;
        }

        let tolerance = HIT_TOLERANCE_PX / self.viewport.zoom();
        let hit = self
            .scene
            .objects_at_point(point, tolerance)
            .into_iter()
            .find(|id| self.scene.get(*id).is_some_and(|o| o.selectable));
        self.set_selection(hit.into_iter().collect());
        self.drag = hit.map(|_| DragState {
            last: point,
            moved: false,
        });
    }

    /// Pointer moved to a viewport point.
    pub fn pointer_move(&mut self, screen_point: Point) {
        let point = self.viewport.screen_to_document(screen_point);
        match self.drag {
            Some(drag) => {
                let moved = self.move_selected(point - drag.last);
                self.drag = Some(DragState {
                    last: point,
                    moved: drag.moved || moved,
                });
            }
            None => self.tools.update(point),
        }
    }

    /// Pointer released. Returns the id of a newly placed object.
    pub fn pointer_up(&mut self, screen_point: Point) -> Option<ObjectId> {
        let point = self.viewport.screen_to_document(screen_point);
        if let Some(drag) = self.drag.take() {
            if drag.moved {
                self.commit_interaction();
            }
            return None;
        }
        let placement = self.tools.end(point)?;
        let placed = self.place(placement);
        self.set_tool(ToolKind::Select);
        placed
    }

    fn place(&mut self, placement: Placement) -> Option<ObjectId> {
        let start = placement.start;
        match placement.tool {
            ToolKind::Select => None,
            ToolKind::Text => Some(self.add_text_at(start, "Text")),
            ToolKind::Image => {
                self.events.push(EditorEvent::ImageRequested { anchor: start });
                None
            }
            ToolKind::ShapeRect => {
                let rect = if placement.is_click() {
                    let side = self.viewport.mm_to_px(DEFAULT_SHAPE_MM);
                    Rect::from_origin_size(start, (side, side))
                } else {
                    placement.rect()
                };
                Some(self.insert_selected(self.rectangle_object(rect)))
            }
            ToolKind::ShapeCircle => {
                let object = if placement.is_click() {
                    let radius = self.viewport.mm_to_px(DEFAULT_SHAPE_MM / 2.0);
                    self.circle_object(start - Vec2::new(radius, radius), radius)
                } else {
                    let rect = placement.rect();
                    self.circle_object(rect.origin(), rect.width().max(rect.height()) / 2.0)
                };
                Some(self.insert_selected(object))
            }
            ToolKind::Line => {
                let end = if placement.is_click() {
                    start + Vec2::new(self.viewport.mm_to_px(DEFAULT_LINE_MM), 0.0)
                } else {
                    placement.end
                };
                Some(self.insert_selected(line_object(start, end)))
            }
            ToolKind::GuideH => Some(self.add_horizontal_guide(start.y)),
            ToolKind::GuideV => Some(self.add_vertical_guide(start.x)),
        }
    }

    // --- Fonts ---

    /// Font requests the host has not seen yet.
    pub fn take_font_requests(&mut self) -> Vec<FontRequest> {
        self.fonts.take_requests()
    }

    /// Whether a font update is waiting for `id`.
    pub fn has_pending_font(&self, id: ObjectId) -> bool {
        self.fonts.is_pending(id)
    }

    /// Apply the parked patch a resolution answers. Stale or orphaned
    /// resolutions are dropped and return false.
    pub fn resolve_font(&mut self, resolution: FontResolution) -> bool {
        let id = resolution.object_id;
        if !self.scene.contains(id) {
            self.fonts.forget(id);
            log::debug!("Dropping font resolution for removed object {id}");
            return false;
        }
        let Some(mut patch) = self.fonts.settle(&resolution) else {
            return false;
        };

        if !resolution.loaded {
            let requested = patch
                .font_family
                .clone()
                .or_else(|| {
                    self.scene
                        .get(id)
                        .and_then(|o| o.kind.as_text())
                        .map(|t| t.font_family.clone())
                })
                .unwrap_or_default();
            log::warn!("Font {requested:?} unavailable, using {FALLBACK_FONT_FAMILY}");
            patch = patch.with_font_family(FALLBACK_FONT_FAMILY);
            self.events.push(EditorEvent::FontFallback {
                object_id: id,
                requested,
            });
        }

        self.scene.update_object(id, &patch);
        self.tools.apply_interactivity(&mut self.scene);
        self.commit();
        true
    }

    /// Drive every outstanding font request through `loader`. Returns the
    /// number of updates applied.
    pub async fn resolve_fonts_with(&mut self, loader: &dyn FontLoader) -> usize {
        let mut applied = 0;
        for request in self.take_font_requests() {
            let loaded = loader
                .ensure_font_loaded(&request.family, request.weight, request.italic)
                .await;
            let resolution = FontResolution {
                ticket: request.ticket,
                object_id: request.object_id,
                loaded,
            };
            if self.resolve_font(resolution) {
                applied += 1;
            }
        }
        applied
    }

    // --- Viewport ---

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport.set_viewport_size(width, height);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        self.viewport.zoom_at(screen_point, factor);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.viewport.pan(delta);
    }

    pub fn fit_to_viewport(&mut self) {
        self.viewport.fit();
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        log::debug!(
            "Closing editor with {} objects and {} history entries",
            self.scene.len(),
            self.history.len()
        );
    }
}

fn line_object(start: Point, end: Point) -> SceneObject {
    SceneObject::new(ObjectKind::Line(Line::new(Point::ZERO, (end - start).to_point())))
        .at(start.x, start.y)
        .with_style(ObjectStyle::outline(SerializableColor::black(), 1.0))
}

/// Axis and position of a ruler guide.
fn guide_position(object: &SceneObject) -> Option<(GuideAxis, f64)> {
    match object.role {
        ObjectRole::RulerGuide(GuideAxis::Horizontal) => Some((GuideAxis::Horizontal, object.top)),
        ObjectRole::RulerGuide(GuideAxis::Vertical) => Some((GuideAxis::Vertical, object.left)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::FontWeight;
    use crate::fonts::BoxFuture;
    use std::io::Cursor;

    fn card() -> PageSpec {
        PageSpec::new(85.0, 55.0, 3.0, 300.0, 3.0).unwrap()
    }

    fn editor() -> Editor {
        Editor::new(card(), EditorConfig::default()).unwrap()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 255, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn content_count(editor: &Editor) -> usize {
        editor.get_layers().len()
    }

    #[test]
    fn test_new_installs_system_objects() {
        let editor = editor();
        let scene = editor.scene();
        assert_eq!(scene.len(), 3);
        let background = scene.get(scene.find_system(SystemKind::Background).unwrap()).unwrap();
        assert_eq!(background.bounds(), Rect::new(0.0, 0.0, 182.0, 122.0));
        assert!(background.exclude_from_export && !background.evented);
        let trim = scene.get(scene.find_system(SystemKind::TrimGuide).unwrap()).unwrap();
        assert!(trim.exclude_from_export && !trim.evented);
        assert!(editor.get_layers().is_empty());
        assert!(!editor.can_undo());
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_invalid_page_is_geometry_error() {
        let page = PageSpec {
            width_mm: 0.0,
            height_mm: 50.0,
            bleed_mm: 0.0,
            dpi: 300.0,
            safe_area_mm: 0.0,
        };
        let err = Editor::new(page, EditorConfig::default()).err().unwrap();
        assert_eq!(err.reason(), FailureReason::InvalidGeometry);
    }

    #[test]
    fn test_add_and_undo_redo() {
        let mut editor = editor();
        let id = editor.add_rectangle();
        assert_eq!(content_count(&editor), 1);
        assert_eq!(editor.selection(), &[id]);
        assert!(editor.can_undo());

        assert!(editor.undo());
        assert_eq!(content_count(&editor), 0);
        assert!(editor.selection().is_empty());
        assert!(!editor.undo());

        assert!(editor.redo());
        assert_eq!(editor.get_layers()[0].id, id);
        assert!(!editor.redo());
        assert_eq!(editor.scene().len(), 4);
    }

    #[test]
    fn test_commit_emits_events() {
        let mut editor = editor();
        editor.drain_events();
        editor.add_circle();
        let events = editor.drain_events();
        assert!(events.contains(&EditorEvent::SceneChanged));
        assert!(events.iter().any(|e| matches!(e, EditorEvent::LayersChanged(l) if l.len() == 1)));
        assert!(events.contains(&EditorEvent::HistoryChanged {
            can_undo: true,
            can_redo: false
        }));
        assert!(editor.drain_events().is_empty());
    }

    #[test]
    fn test_new_commit_after_undo_drops_redo() {
        let mut editor = editor();
        editor.add_rectangle();
        editor.add_circle();
        editor.add_line();
        editor.undo();
        editor.undo();
        editor.add_text("Hello");
        assert!(!editor.can_redo());
        assert_eq!(editor.history().len(), 3);
        assert_eq!(content_count(&editor), 2);
    }

    #[test]
    fn test_content_stays_below_guides() {
        let mut editor = editor();
        let guide = editor.add_horizontal_guide(40.0);
        let contour = editor.add_cut_contour(2.0);
        let rect = editor.add_rectangle();
        let order = editor.scene().ordered_ids();
        let pos = |id| order.iter().position(|&o| o == id).unwrap();
        assert!(pos(rect) < pos(contour));
        assert!(pos(contour) < pos(guide));
        assert!(editor.scene().is_band_ordered());
        assert_eq!(
            order[0],
            editor.scene().find_system(SystemKind::Background).unwrap()
        );
    }

    #[test]
    fn test_guide_label_reads_distance_from_bottom_trim() {
        let page = PageSpec::new(100.0, 100.0, 3.0, 300.0, 5.0).unwrap();
        let mut editor = Editor::new(page, EditorConfig::default()).unwrap();
        let trim = editor.boxes().trim;
        let id = editor.add_horizontal_guide(trim.y0);
        assert_eq!(editor.guide_label_of(id), Some("100.0 mm"));

        let history_len = editor.history().len();
        assert!(editor.move_guide(id, (trim.y0 + trim.y1) / 2.0));
        assert_eq!(editor.guide_label_of(id), Some("50.0 mm"));
        assert_eq!(editor.history().len(), history_len);

        assert!(editor.commit_interaction());
        assert_eq!(editor.history().len(), history_len + 1);
        assert!(!editor.commit_interaction());
    }

    #[test]
    fn test_vertical_guide_moves_on_its_axis_only() {
        let page = PageSpec::new(100.0, 100.0, 0.0, 300.0, 5.0).unwrap();
        let mut editor = Editor::new(page, EditorConfig::default()).unwrap();
        let id = editor.add_vertical_guide(20.0);
        assert_eq!(editor.guide_label_of(id), Some("10.0 mm"));
        assert!(editor.select(id));
        assert!(editor.move_selected(Vec2::new(20.0, 15.0)));
        let guide = editor.scene().get(id).unwrap();
        assert_eq!((guide.left, guide.top), (40.0, 0.0));
        assert_eq!(editor.guide_label_of(id), Some("20.0 mm"));
        assert!(guide.exclude_from_export);
        assert!(editor.get_layers().is_empty());
    }

    #[test]
    fn test_props_patch_keeps_guide_on_axis() {
        let page = PageSpec::new(100.0, 100.0, 3.0, 300.0, 5.0).unwrap();
        let mut editor = Editor::new(page, EditorConfig::default()).unwrap();
        let trim = editor.boxes().trim;
        let id = editor.add_horizontal_guide(trim.y0);
        assert!(editor.select(id));
        let left = editor.scene().get(id).unwrap().left;
        let before = editor.history().len();

        let mid = (trim.y0 + trim.y1) / 2.0;
        let patch = ObjectPatch {
            top: Some(mid),
            left: Some(33.0),
            ..Default::default()
        };
        assert!(editor.update_selected_props(&patch));
        let guide = editor.scene().get(id).unwrap();
        assert_eq!((guide.left, guide.top), (left, mid));
        assert_eq!(editor.guide_label_of(id), Some("50.0 mm"));
        assert_eq!(editor.history().len(), before + 1);

        // Only the off-axis coordinate: nothing to do.
        let sideways = ObjectPatch {
            left: Some(50.0),
            ..Default::default()
        };
        assert!(!editor.update_selected_props(&sideways));
        assert_eq!(editor.scene().get(id).unwrap().left, left);
    }

    #[test]
    fn test_undo_during_drag_reverts_the_drag() {
        let mut editor = editor();
        let id = editor.add_rectangle();
        let left = editor.scene().get(id).unwrap().left;
        assert!(editor.move_selected(Vec2::new(15.0, 0.0)));

        assert!(editor.undo());
        assert_eq!(editor.scene().get(id).unwrap().left, left);
        assert_eq!(content_count(&editor), 1);
        assert!(!editor.commit_interaction());

        assert!(editor.redo());
        assert!((editor.scene().get(id).unwrap().left - (left + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cut_contour_replaces_existing() {
        let mut editor = editor();
        let first = editor.add_cut_contour(0.0);
        let second = editor.add_cut_contour(3.0);
        assert!(!editor.scene().contains(first));
        let contour = editor.scene().get(second).unwrap();
        assert!(contour.exclude_from_export);
        assert!(contour.style.fill.is_none());
        assert_eq!(contour.style.stroke, Some(SerializableColor::magenta()));
        let trim = editor.boxes().trim;
        let bounds = contour.bounds();
        assert!((bounds.x0 - trim.x0).abs() < 1e-6 && (bounds.x1 - trim.x1).abs() < 1e-6);
        assert!(editor.get_json().unwrap().contains("cut_contour"));
    }

    #[test]
    fn test_template_covers_bleed_box() {
        let mut editor = editor();
        let first = editor.add_pdf_template(&png(91, 61)).unwrap();
        let id = editor.add_pdf_template(&png(364, 244)).unwrap();
        assert!(!editor.scene().contains(first));
        let template = editor.scene().get(id).unwrap();
        assert_eq!(template.role, ObjectRole::TemplateOverlay);
        assert!(template.locked && template.exclude_from_export);
        assert!((template.style.opacity - 0.5).abs() < 1e-9);
        let bounds = template.bounds();
        assert!((bounds.width() - 182.0).abs() < 1e-6);
        assert!((bounds.height() - 122.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_image_decode_failure_does_not_mutate() {
        let mut editor = editor();
        let history_len = editor.history().len();
        let err = editor.add_image(b"not an image", None).unwrap_err();
        assert_eq!(err.reason(), FailureReason::DecodeFailed);
        assert_eq!(editor.history().len(), history_len);
        assert_eq!(editor.scene().len(), 3);
    }

    #[test]
    fn test_add_image_at_source_dpi() {
        let mut editor = editor();
        let id = editor.add_image(&png(40, 20), Some(101.6)).unwrap();
        let image = editor.scene().get(id).unwrap();
        assert!((image.scale_x - 0.5).abs() < 1e-9);
        assert_eq!(editor.get_layers()[0].kind, "image");

        // Physical size wins even when the image overflows the page.
        let wide = editor.add_image(&png(400, 100), Some(50.8)).unwrap();
        assert_eq!(editor.scene().get(wide).unwrap().scale_x, 1.0);
    }

    #[test]
    fn test_delete_and_duplicate_selected() {
        let mut editor = editor();
        let id = editor.add_rectangle();
        let original = editor.scene().get(id).unwrap().clone();

        let copies = editor.duplicate_selected().unwrap();
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0], id);
        let copy = editor.scene().get(copies[0]).unwrap();
        assert!((copy.left - original.left - 10.0).abs() < 1e-9);
        assert!((copy.top - original.top - 10.0).abs() < 1e-9);
        assert_eq!(editor.selection(), copies.as_slice());

        assert_eq!(editor.delete_selected(), 1);
        assert!(editor.scene().contains(id));
        assert_eq!(content_count(&editor), 1);
        assert_eq!(editor.delete_selected(), 0);
    }

    #[test]
    fn test_update_props_applies_and_commits() {
        let mut editor = editor();
        editor.add_rectangle();
        let before = editor.history().len();
        let patch = ObjectPatch {
            fill: Some(Some(SerializableColor::new(255, 0, 0, 255))),
            width: Some(50.0),
            ..Default::default()
        };
        assert!(editor.update_selected_props(&patch));
        assert_eq!(editor.history().len(), before + 1);
        let id = editor.selection()[0];
        let ObjectKind::Rect(rect) = &editor.scene().get(id).unwrap().kind else {
            panic!("expected rect");
        };
        assert_eq!(rect.width, 50.0);

        // Same patch again changes nothing.
        assert!(!editor.update_selected_props(&patch));
        assert_eq!(editor.history().len(), before + 1);
    }

    #[test]
    fn test_font_patch_waits_for_resolution() {
        let mut editor = editor();
        let id = editor.add_text("Hello");
        let before = editor.history().len();
        let patch = ObjectPatch {
            font_family: Some("Lato".to_string()),
            font_weight: Some(FontWeight::Bold),
            ..Default::default()
        };
        assert!(editor.update_selected_props(&patch));
        assert_eq!(editor.history().len(), before);
        assert!(editor.has_pending_font(id));

        let requests = editor.take_font_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].weight, FontWeight::Bold);

        assert!(editor.resolve_font(FontResolution {
            ticket: requests[0].ticket,
            object_id: id,
            loaded: true,
        }));
        assert_eq!(editor.history().len(), before + 1);
        let text = editor.scene().get(id).unwrap().kind.as_text().unwrap();
        assert_eq!(text.font_family, "Lato");
        assert_eq!(text.font_weight, FontWeight::Bold);
    }

    #[test]
    fn test_font_fallback_and_stale_tickets() {
        let mut editor = editor();
        let id = editor.add_text("Hello");
        editor.update_selected_props(&ObjectPatch::new().with_font_family("Missing"));
        let stale = editor.take_font_requests()[0].ticket;
        editor.update_selected_props(&ObjectPatch::new().with_font_family("Also Missing"));
        let current = editor.take_font_requests()[0].ticket;
        let before = editor.history().len();
        editor.drain_events();

        assert!(!editor.resolve_font(FontResolution {
            ticket: stale,
            object_id: id,
            loaded: true,
        }));
        assert!(editor.resolve_font(FontResolution {
            ticket: current,
            object_id: id,
            loaded: false,
        }));
        assert_eq!(editor.history().len(), before + 1);
        let text = editor.scene().get(id).unwrap().kind.as_text().unwrap();
        assert_eq!(text.font_family, FALLBACK_FONT_FAMILY);
        assert!(editor.drain_events().contains(&EditorEvent::FontFallback {
            object_id: id,
            requested: "Also Missing".to_string(),
        }));
    }

    #[test]
    fn test_font_resolution_for_deleted_object_is_dropped() {
        let mut editor = editor();
        let id = editor.add_text("Hello");
        editor.update_selected_props(&ObjectPatch::new().with_font_family("Lato"));
        let ticket = editor.take_font_requests()[0].ticket;
        editor.delete_selected();
        let before = editor.history().len();
        assert!(!editor.resolve_font(FontResolution {
            ticket,
            object_id: id,
            loaded: true,
        }));
        assert_eq!(editor.history().len(), before);
    }

    struct OnlyLato;

    impl FontLoader for OnlyLato {
        fn ensure_font_loaded(&self, family: &str, _weight: FontWeight, _italic: bool) -> BoxFuture<'_, bool> {
            let found = family == "Lato";
            Box::pin(async move { found })
        }
    }

    #[test]
    fn test_resolve_fonts_with_loader() {
        let mut editor = editor();
        let a = editor.add_text("A");
        editor.update_selected_props(&ObjectPatch::new().with_font_family("Lato"));
        let b = editor.add_text("B");
        editor.update_selected_props(&ObjectPatch::new().with_font_family("Nope"));

        let applied = pollster::block_on(editor.resolve_fonts_with(&OnlyLato));
        assert_eq!(applied, 2);
        let family = |id| {
            editor.scene().get(id).unwrap().kind.as_text().unwrap().font_family.clone()
        };
        assert_eq!(family(a), "Lato");
        assert_eq!(family(b), FALLBACK_FONT_FAMILY);
    }

    #[test]
    fn test_json_round_trip_rescales_to_display_dpi() {
        let mut editor = editor();
        let id = editor.add_rectangle();
        let original = editor.scene().get(id).unwrap().clone();
        let json = editor.get_json().unwrap();

        let config = EditorConfig {
            display_dpi: 101.6,
            ..EditorConfig::default()
        };
        let mut other = Editor::new(card(), config).unwrap();
        other.add_circle();
        other.load_json(&json).unwrap();

        let loaded = other.scene().get(id).unwrap();
        assert!((loaded.left - original.left * 2.0).abs() < 1e-9);
        assert!((loaded.scale_x - 2.0).abs() < 1e-9);
        assert_eq!(other.get_layers().len(), 1);
        assert!(!other.can_undo());
        assert!(other.scene().find_system(SystemKind::SafeGuide).is_some());
        assert_eq!(other.scene().len(), 4);
    }

    #[test]
    fn test_load_json_rejects_garbage() {
        let mut editor = editor();
        let err = editor.load_json("{").unwrap_err();
        assert_eq!(err.reason(), FailureReason::InvalidDocument);
        assert_eq!(editor.scene().len(), 3);
    }

    #[test]
    fn test_import_json_appends_content() {
        let mut source = editor();
        source.add_rectangle();
        source.add_horizontal_guide(10.0);
        let json = source.get_json().unwrap();

        let mut editor = editor();
        editor.add_circle();
        let ids = editor.import_json(&json).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(content_count(&editor), 2);
        assert!(editor.can_undo());
        editor.undo();
        assert_eq!(content_count(&editor), 1);
    }

    #[test]
    fn test_document_round_trip() {
        let mut editor = editor();
        editor.add_text("Card");
        let document = editor.to_document("Business card");
        let reopened = Editor::open(&document, EditorConfig::default()).unwrap();
        assert_eq!(reopened.get_layers(), editor.get_layers());
        assert_eq!(reopened.page(), editor.page());
    }

    #[test]
    fn test_layer_operations() {
        let mut editor = editor();
        let bottom = editor.add_rectangle();
        let top = editor.add_circle();
        assert_eq!(editor.get_layers()[0].id, top);

        assert!(editor.move_layer_up(bottom));
        assert_eq!(editor.get_layers()[0].id, bottom);
        assert!(!editor.move_layer_up(bottom));
        assert!(editor.move_layer_down(bottom));

        assert_eq!(editor.toggle_layer_visibility(top), Some(false));
        assert!(!editor.get_layers()[0].visible);

        let background = editor.scene().find_system(SystemKind::Background).unwrap();
        assert!(!editor.select_layer(background));
        assert_eq!(editor.toggle_layer_visibility(background), None);

        assert!(editor.select_layer(bottom));
        assert!(editor.bring_to_front());
        assert_eq!(editor.get_layers()[0].id, bottom);
        assert!(editor.send_to_back());
        assert_eq!(editor.get_layers()[1].id, bottom);
    }

    #[test]
    fn test_tool_change_narrows_interactivity() {
        let mut editor = editor();
        let id = editor.add_rectangle();
        let guide = editor.add_horizontal_guide(30.0);
        assert!(editor.set_tool(ToolKind::ShapeCircle));
        assert!(!editor.set_tool(ToolKind::ShapeCircle));
        assert!(!editor.scene().get(id).unwrap().evented);
        assert!(editor.scene().get(guide).unwrap().evented);
        assert!(editor.selection().is_empty());
        assert!(editor.drain_events().contains(&EditorEvent::ToolChanged(ToolKind::ShapeCircle)));

        editor.set_tool(ToolKind::Select);
        assert!(editor.scene().get(id).unwrap().evented);
    }

    #[test]
    fn test_rectangle_placement_gesture() {
        let mut editor = editor();
        editor.set_tool(ToolKind::ShapeRect);
        let to_screen = |editor: &Editor, x, y| editor.viewport().document_to_screen(Point::new(x, y));

        let start = to_screen(&editor, 20.0, 20.0);
        let end = to_screen(&editor, 80.0, 50.0);
        editor.pointer_down(start);
        editor.pointer_move(end);
        let id = editor.pointer_up(end).unwrap();

        let bounds = editor.scene().get(id).unwrap().bounds();
        assert!((bounds.x0 - 20.0).abs() < 1e-6 && (bounds.y0 - 20.0).abs() < 1e-6);
        assert!((bounds.width() - 60.0).abs() < 1e-6 && (bounds.height() - 30.0).abs() < 1e-6);
        assert_eq!(editor.current_tool(), ToolKind::Select);
        assert_eq!(editor.selection(), &[id]);
    }

    #[test]
    fn test_image_tool_asks_host_for_image() {
        let mut editor = editor();
        editor.set_tool(ToolKind::Image);
        let point = editor.viewport().document_to_screen(Point::new(10.0, 10.0));
        editor.pointer_down(point);
        assert_eq!(editor.pointer_up(point), None);
        let events = editor.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            EditorEvent::ImageRequested { anchor } if (anchor.x - 10.0).abs() < 1e-6
        )));
        assert_eq!(content_count(&editor), 0);
    }

    #[test]
    fn test_select_drag_commits_once() {
        let mut editor = editor();
        let id = editor.add_rectangle();
        editor.clear_selection();
        let center = editor.scene().get(id).unwrap().center();
        let before = editor.history().len();

        let screen = |editor: &Editor, p: Point| editor.viewport().document_to_screen(p);
        editor.pointer_down(screen(&editor, center));
        assert_eq!(editor.selection(), &[id]);
        editor.pointer_move(screen(&editor, center + Vec2::new(5.0, 0.0)));
        editor.pointer_move(screen(&editor, center + Vec2::new(10.0, 4.0)));
        editor.pointer_up(screen(&editor, center + Vec2::new(10.0, 4.0)));

        assert_eq!(editor.history().len(), before + 1);
        let moved = editor.scene().get(id).unwrap().center();
        assert!((moved.x - center.x - 10.0).abs() < 1e-6);
        assert!((moved.y - center.y - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_click_on_background_selects_nothing() {
        let mut editor = editor();
        let point = editor.viewport().document_to_screen(Point::new(5.0, 5.0));
        editor.pointer_down(point);
        assert!(editor.selection().is_empty());
        editor.pointer_up(point);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_history_capacity_from_config() {
        let config = EditorConfig {
            history_capacity: 3,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(card(), config).unwrap();
        for _ in 0..5 {
            editor.add_rectangle();
        }
        assert_eq!(editor.history().len(), 3);
        assert!(editor.undo());
        assert!(editor.undo());
        assert!(!editor.undo());
        assert_eq!(content_count(&editor), 3);
    }

    #[test]
    fn test_replace_page_rebuilds_system_objects() {
        let mut editor = editor();
        editor.add_rectangle();
        editor.add_cut_contour(0.0);
        let guide_y = editor.boxes().trim.y0;
        editor.add_horizontal_guide(guide_y);

        let a5 = PageSpec::new(148.0, 210.0, 3.0, 300.0, 5.0).unwrap();
        editor.replace_page(a5).unwrap();

        let background = editor.scene().get(editor.scene().find_system(SystemKind::Background).unwrap()).unwrap();
        assert_eq!(background.bounds(), Rect::new(0.0, 0.0, 308.0, 432.0));
        assert_eq!(content_count(&editor), 1);
        assert!(editor.scene().ids_where(|r| *r == ObjectRole::CutContour).is_empty());
        let guides = editor.scene().ids_where(|r| matches!(r, ObjectRole::RulerGuide(_)));
        assert_eq!(guides.len(), 1);
        assert_eq!(editor.guide_label_of(guides[0]), Some("210.0 mm"));
        assert!(!editor.can_undo());
        assert!(editor.replace_page(PageSpec { dpi: -1.0, ..a5 }).is_err());
    }

    #[test]
    fn test_import_svg_selects_artwork() {
        let mut editor = editor();
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="40">
            <rect width="40" height="40" fill="#00ff00"/>
        </svg>"##;
        let id = editor.import_svg(svg).unwrap();
        assert_eq!(editor.selection(), &[id]);
        assert_eq!(editor.get_layers()[0].name, "Vector artwork");
        let err = editor.import_svg("nope").unwrap_err();
        assert_eq!(err.reason(), FailureReason::DecodeFailed);
    }
}
