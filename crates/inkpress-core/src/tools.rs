//! Tool state machine.

use crate::scene::Scene;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Drags shorter than this (in document px) count as a click.
pub const CLICK_THRESHOLD: f64 = 3.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Select,
    Text,
    Image,
    ShapeRect,
    ShapeCircle,
    Line,
    GuideH,
    GuideV,
}

impl ToolKind {
    /// Whether the tool places a new object with a pointer gesture.
    pub fn is_placement(&self) -> bool {
        !matches!(self, ToolKind::Select)
    }

    /// Get display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Text => "Text",
            ToolKind::Image => "Image",
            ToolKind::ShapeRect => "Rectangle",
            ToolKind::ShapeCircle => "Circle",
            ToolKind::Line => "Line",
            ToolKind::GuideH => "Horizontal guide",
            ToolKind::GuideV => "Vertical guide",
        }
    }

    /// Get all tools.
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Select,
            ToolKind::Text,
            ToolKind::Image,
            ToolKind::ShapeRect,
            ToolKind::ShapeCircle,
            ToolKind::Line,
            ToolKind::GuideH,
            ToolKind::GuideV,
        ]
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ToolState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// A placement gesture is in progress.
    Active {
        /// Starting point of the interaction.
        start: Point,
        /// Current point of the interaction.
        current: Point,
    },
}

/// A finished placement gesture in document px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub tool: ToolKind,
    pub start: Point,
    pub end: Point,
}

impl Placement {
    /// Rectangle spanned by the gesture.
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    /// Whether the gesture was a click rather than a drag.
    pub fn is_click(&self) -> bool {
        self.start.distance(self.end) < CLICK_THRESHOLD
    }
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    current_tool: ToolKind,
    state: ToolState,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected tool.
    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    /// Set the current tool. Re-entering the active tool is a no-op and returns false.
    pub fn set_tool(&mut self, tool: ToolKind) -> bool {
        if tool == self.current_tool {
            return false;
        }
        log::debug!("Tool {:?} -> {:?}", self.current_tool, tool);
        self.current_tool = tool;
        self.state = ToolState::Idle;
        true
    }

    /// Allow content selection only under the select tool.
    ///
    /// System objects, guides, templates and cut contours keep their own flags.
    pub fn apply_interactivity(&self, scene: &mut Scene) {
        let interactive = self.current_tool == ToolKind::Select;
        for object in scene.objects_mut().filter(|o| o.role.is_content()) {
            object.selectable = interactive;
            object.evented = interactive;
        }
    }

    /// Begin a placement gesture. Ignored under the select tool.
    pub fn begin(&mut self, point: Point) {
        if self.current_tool.is_placement() {
            self.state = ToolState::Active {
                start: point,
                current: point,
            };
        }
    }

    /// Update the current gesture.
    pub fn update(&mut self, point: Point) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// Finish the gesture.
    pub fn end(&mut self, point: Point) -> Option<Placement> {
        let ToolState::Active { start, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        Some(Placement {
            tool: self.current_tool,
            start,
            end: point,
        })
    }

    /// Abandon the current gesture.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// Check if a gesture is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ObjectKind, ObjectRole, Rectangle, SceneObject, SystemKind};

    #[test]
    fn test_reentering_tool_is_noop() {
        let mut tools = ToolManager::new();
        assert!(!tools.set_tool(ToolKind::Select));
        assert!(tools.set_tool(ToolKind::Text));
        assert!(!tools.set_tool(ToolKind::Text));
        assert_eq!(tools.current_tool(), ToolKind::Text);
    }

    #[test]
    fn test_placement_gesture() {
        let mut tools = ToolManager::new();
        tools.begin(Point::new(1.0, 1.0));
        assert!(!tools.is_active());

        tools.set_tool(ToolKind::ShapeRect);
        tools.begin(Point::new(10.0, 10.0));
        tools.update(Point::new(20.0, 15.0));
        assert!(tools.is_active());
        let placement = tools.end(Point::new(40.0, 30.0)).unwrap();
        assert_eq!(placement.tool, ToolKind::ShapeRect);
        assert_eq!(placement.rect(), Rect::new(10.0, 10.0, 40.0, 30.0));
        assert!(!placement.is_click());
        assert!(!tools.is_active());
        assert!(tools.end(Point::ZERO).is_none());
    }

    #[test]
    fn test_apply_interactivity_touches_content_only() {
        let mut scene = Scene::new();
        let rect = || SceneObject::new(ObjectKind::Rect(Rectangle::new(5.0, 5.0)));
        let content = scene.add_object(rect());
        let guide = scene.add_object(rect().with_role(ObjectRole::System(SystemKind::TrimGuide)));
        let template = scene.add_object(rect().with_role(ObjectRole::TemplateOverlay));

        let mut tools = ToolManager::new();
        tools.set_tool(ToolKind::Text);
        tools.apply_interactivity(&mut scene);
        assert!(!scene.get(content).unwrap().selectable);
        assert!(!scene.get(guide).unwrap().selectable);
        assert!(!scene.get(template).unwrap().evented);

        tools.set_tool(ToolKind::Select);
        tools.apply_interactivity(&mut scene);
        assert!(scene.get(content).unwrap().selectable);
        assert!(scene.get(content).unwrap().evented);
        assert!(!scene.get(guide).unwrap().selectable);
    }
}
