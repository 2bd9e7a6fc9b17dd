//! Inkpress Core Library
//!
//! Document and scene engine for the Inkpress print editor: page geometry in
//! millimeters, a role-banded scene graph, snapshot history, import of external
//! artwork and the editor session that ties them together.

pub mod config;
pub mod document;
pub mod editor;
pub mod fonts;
pub mod history;
pub mod import;
pub mod objects;
pub mod scene;
pub mod tools;
pub mod units;
pub mod viewport;

pub use config::{DEFAULT_DISPLAY_DPI, EditorConfig};
pub use document::DesignDocument;
pub use editor::{Editor, EditorError, EditorEvent, FailureReason};
pub use fonts::{BoxFuture, FALLBACK_FONT_FAMILY, FontLoader, FontRequest, FontResolution};
pub use history::{History, MAX_UNDO_HISTORY, Snapshot};
pub use import::{ImportContext, ImportError};
pub use objects::{
    Band, GuideAxis, ObjectId, ObjectKind, ObjectPatch, ObjectRole, ObjectStyle, SceneObject,
    SerializableColor, SystemKind,
};
pub use scene::{Direction, LayerDescriptor, SCENE_VERSION, Scene, SceneError, SceneState};
pub use tools::{ToolKind, ToolManager};
pub use units::{GeometryError, PageBoxes, PageSpec, compute_page_boxes, mm_to_px, px_to_mm};
pub use viewport::{DisplayConfig, Viewport};
