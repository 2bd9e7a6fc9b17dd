//! Partial property updates.

use super::{FontWeight, ObjectKind, SceneObject, SerializableColor, TextAlign};
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguish "field absent" (`None`) from "explicitly cleared" (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A set of property changes to merge into an object.
///
/// Absent fields are left untouched. Kind-specific fields are ignored for
/// objects of another kind, and placement fields are ignored while an object is
/// locked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill: Option<Option<SerializableColor>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub stroke: Option<Option<SerializableColor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,

    // Text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,

    // Rect and circle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl ObjectPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a patch from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether applying this patch to a text object needs a font to be loaded.
    pub fn touches_font(&self) -> bool {
        self.font_family.is_some() || self.font_weight.is_some() || self.italic.is_some()
    }

    /// Copy of this patch with the font family replaced.
    pub fn with_font_family(&self, family: &str) -> Self {
        Self {
            font_family: Some(family.to_string()),
            ..self.clone()
        }
    }

    /// Copy of this patch without position, scale or rotation.
    pub fn without_placement(&self) -> Self {
        Self {
            left: None,
            top: None,
            scale_x: None,
            scale_y: None,
            angle: None,
            ..self.clone()
        }
    }

    /// Merge into `object`. Returns true when anything changed.
    pub fn apply_to(&self, object: &mut SceneObject) -> bool {
        let before = object.clone();

        if let Some(locked) = self.locked {
            object.locked = locked;
            object.derive_interaction();
        }
        if let Some(name) = &self.name {
            object.name = name.clone();
        }
        if let Some(visible) = self.visible {
            object.visible = visible;
        }
        if let Some(opacity) = self.opacity {
            object.style.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(fill) = self.fill {
            object.style.fill = fill;
        }
        if let Some(stroke) = self.stroke {
            object.style.stroke = stroke;
        }
        if let Some(width) = self.stroke_width {
            object.style.stroke_width = width.max(0.0);
        }

        if !object.locked {
            set(&mut object.left, self.left);
            set(&mut object.top, self.top);
            set(&mut object.scale_x, self.scale_x);
            set(&mut object.scale_y, self.scale_y);
            set(&mut object.angle, self.angle);
        }

        match &mut object.kind {
            ObjectKind::Text(text) => {
                if let Some(content) = &self.content {
                    text.content = content.clone();
                }
                if let Some(family) = &self.font_family {
                    text.font_family = family.clone();
                }
                if let Some(weight) = self.font_weight {
                    text.font_weight = weight;
                }
                if let Some(italic) = self.italic {
                    text.italic = italic;
                }
                if let Some(align) = self.align {
                    text.align = align;
                }
                set(&mut text.font_size, self.font_size.filter(|s| *s > 0.0));
                set(&mut text.line_height, self.line_height.filter(|h| *h > 0.0));
            }
            ObjectKind::Rect(rect) => {
                set(&mut rect.width, self.width.filter(|w| *w >= 0.0));
                set(&mut rect.height, self.height.filter(|h| *h >= 0.0));
                set(&mut rect.corner_radius, self.corner_radius.map(|r| r.max(0.0)));
            }
            ObjectKind::Circle(circle) => {
                set(&mut circle.radius, self.radius.filter(|r| *r >= 0.0));
            }
            ObjectKind::Image(_) | ObjectKind::Line(_) | ObjectKind::Path(_) | ObjectKind::Group(_) => {}
        }

        *object != before
    }
}

fn set(target: &mut f64, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        *target = v;
    }
}
