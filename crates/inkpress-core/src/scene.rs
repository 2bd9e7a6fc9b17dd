//! Layered scene graph with role-pinned z-order bands.

use crate::objects::{Band, ObjectId, ObjectKind, ObjectPatch, ObjectRole, SceneObject, SystemKind};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Current version of the persisted scene layout.
pub const SCENE_VERSION: u32 = 1;

/// Errors raised when reading a persisted scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("malformed scene JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported scene version {found} (expected at most {SCENE_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("scene display DPI must be positive, got {0}")]
    InvalidDpi(f64),
}

/// Direction of a single z-order step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the front.
    Up,
    /// Towards the back.
    Down,
}

/// Read-only projection of a content object for layer panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: ObjectId,
    /// Object kind name (`"text"`, `"image"`, ...).
    pub kind: String,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
}

/// Persisted form of a scene: objects bottom first, ids preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub version: u32,
    /// Display DPI the coordinates were recorded at.
    pub display_dpi: f64,
    pub objects: Vec<SceneObject>,
}

impl SceneState {
    /// Parse and check a persisted scene.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let state: SceneState = serde_json::from_str(json)?;
        if state.version > SCENE_VERSION {
            return Err(SceneError::UnsupportedVersion {
                found: state.version,
            });
        }
        if !(state.display_dpi.is_finite() && state.display_dpi > 0.0) {
            return Err(SceneError::InvalidDpi(state.display_dpi));
        }
        Ok(state)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Rescale placement so the state matches `display_dpi`.
    pub fn rescale_to(&mut self, display_dpi: f64) {
        let factor = display_dpi / self.display_dpi;
        if (factor - 1.0).abs() < 1e-12 {
            return;
        }
        log::info!(
            "Rescaling scene from {} to {} dpi",
            self.display_dpi,
            display_dpi
        );
        for object in &mut self.objects {
            object.left *= factor;
            object.top *= factor;
            object.scale_x *= factor;
            object.scale_y *= factor;
        }
        self.display_dpi = display_dpi;
    }
}

/// The ordered set of objects on the page.
///
/// Along `z_order` the bands never decrease: background, content, overlays,
/// guides.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: HashMap<ObjectId, SceneObject>,
    /// Z-order of objects (back to front).
    z_order: Vec<ObjectId>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object at the top of its band. A fresh id is always assigned.
    pub fn add_object(&mut self, mut object: SceneObject) -> ObjectId {
        object.regenerate_ids();
        let id = object.id;
        let band = object.role.band();

        let position = self
            .z_order
            .iter()
            .rposition(|other| self.band_of(*other).is_some_and(|b| b <= band))
            .map_or(0, |p| p + 1);

        log::debug!("Adding {} {} at z {}", object.kind.kind_name(), id, position);
        self.objects.insert(id, object);
        self.z_order.insert(position, id);
        self.restore_band_order();
        id
    }

    /// Remove an object together with its children.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let object = self.objects.remove(&id)?;
        self.z_order.retain(|&other| other != id);
        log::debug!("Removed {} {}", object.kind.kind_name(), id);
        Some(object)
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.z_order.clear();
    }

    /// Merge a patch into an object. Returns true when anything changed.
    pub fn update_object(&mut self, id: ObjectId, patch: &ObjectPatch) -> bool {
        self.objects
            .get_mut(&id)
            .is_some_and(|object| patch.apply_to(object))
    }

    /// Get an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Get a mutable object by id.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Objects back to front.
    pub fn ordered(&self) -> impl Iterator<Item = &SceneObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Ids back to front.
    pub fn ordered_ids(&self) -> &[ObjectId] {
        &self.z_order
    }

    /// Mutable access to every object, in no particular order.
    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.values_mut()
    }

    fn band_of(&self, id: ObjectId) -> Option<Band> {
        self.objects.get(&id).map(|o| o.role.band())
    }

    /// Stable partition of `z_order` by band.
    fn restore_band_order(&mut self) {
        let objects = &self.objects;
        self.z_order
            .sort_by_key(|id| objects.get(id).map_or(Band::Guide, |o| o.role.band()));
    }

    /// Whether bands are non-decreasing along the z-order.
    pub fn is_band_ordered(&self) -> bool {
        self.z_order
            .windows(2)
            .all(|w| self.band_of(w[0]) <= self.band_of(w[1]))
    }

    /// Move one step within the object's band. Returns true if it moved.
    pub fn reorder(&mut self, id: ObjectId, direction: Direction) -> bool {
        let Some(pos) = self.z_order.iter().position(|&other| other == id) else {
            return false;
        };
        let neighbor = match direction {
            Direction::Up => pos + 1,
            Direction::Down => match pos.checked_sub(1) {
                Some(n) => n,
                None => return false,
            },
        };
        let Some(&other) = self.z_order.get(neighbor) else {
            return false;
        };
        if self.band_of(other) != self.band_of(id) {
            return false;
        }
        self.z_order.swap(pos, neighbor);
        true
    }

    /// Move to the top of the object's band. Returns true if it moved.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let mut moved = false;
        while self.reorder(id, Direction::Up) {
            moved = true;
        }
        moved
    }

    /// Move to the bottom of the object's band. Returns true if it moved.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let mut moved = false;
        while self.reorder(id, Direction::Down) {
            moved = true;
        }
        moved
    }

    /// Flip visibility. Returns the new state.
    pub fn toggle_visibility(&mut self, id: ObjectId) -> Option<bool> {
        let object = self.objects.get_mut(&id)?;
        object.visible = !object.visible;
        Some(object.visible)
    }

    /// Lock or unlock an object. Returns true if the object exists.
    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        object.locked = locked;
        object.derive_interaction();
        true
    }

    /// Content objects, topmost first.
    pub fn list_layers(&self) -> Vec<LayerDescriptor> {
        self.ordered()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .filter(|o| o.role.is_content())
            .map(|o| LayerDescriptor {
                id: o.id,
                kind: o.kind.kind_name().to_string(),
                name: o.name.clone(),
                visible: o.visible,
                locked: o.locked,
            })
            .collect()
    }

    /// Interactive objects under a point, topmost first.
    pub fn objects_at_point(&self, point: Point, tolerance: f64) -> Vec<ObjectId> {
        self.z_order
            .iter()
            .rev()
            .filter_map(|&id| {
                self.objects
                    .get(&id)
                    .filter(|o| o.visible && o.evented && o.hit_test(point, tolerance))
                    .map(|_| id)
            })
            .collect()
    }

    /// Find the editor-installed object of a kind.
    pub fn find_system(&self, kind: SystemKind) -> Option<ObjectId> {
        self.ordered()
            .find(|o| o.role == ObjectRole::System(kind))
            .map(|o| o.id)
    }

    /// Ids of every object matching a role predicate, back to front.
    pub fn ids_where(&self, predicate: impl Fn(&ObjectRole) -> bool) -> Vec<ObjectId> {
        self.ordered()
            .filter(|o| predicate(&o.role))
            .map(|o| o.id)
            .collect()
    }

    /// Get the bounding box of all content objects.
    pub fn bounds(&self) -> Option<Rect> {
        self.ordered()
            .filter(|o| o.role.is_content())
            .map(SceneObject::bounds)
            .reduce(|acc, b| acc.union(b))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Snapshot the scene in z-order.
    pub fn serialize(&self, display_dpi: f64) -> SceneState {
        SceneState {
            version: SCENE_VERSION,
            display_dpi,
            objects: self.ordered().cloned().collect(),
        }
    }

    /// Replace the whole scene. Ids are preserved and band order restored.
    pub fn deserialize(&mut self, state: SceneState) {
        self.clear();
        for mut object in state.objects {
            object.derive_interaction();
            let id = object.id;
            if self.objects.insert(id, object).is_some() {
                log::warn!("Duplicate object id {id} in scene, keeping the last one");
                self.z_order.retain(|&other| other != id);
            }
            self.z_order.push(id);
        }
        self.restore_band_order();
    }

    /// Number of nested children, for diagnostics.
    pub fn object_count_deep(&self) -> usize {
        fn count(object: &SceneObject) -> usize {
            1 + match &object.kind {
                ObjectKind::Group(g) => g.children.iter().map(count).sum(),
                _ => 0,
            }
        }
        self.objects.values().map(count).sum()
    }
}
