//! Persisted design documents.

use crate::scene::SceneState;
use crate::units::PageSpec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A page description together with its scene, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    pub page: PageSpec,
    pub scene: SceneState,
}

impl DesignDocument {
    /// Create a document with a fresh id.
    pub fn new(name: impl Into<String>, page: PageSpec, scene: SceneState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            page,
            scene,
        }
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
