//! Font lookup for text rendering.
//!
//! Faces come from a `fontdb` database (system fonts plus any bytes the host
//! registers) and are parsed with `rusttype`. Parsed faces are cached per
//! family, weight and style.

use crate::renderer::{RenderError, RenderResult};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use inkpress_core::objects::FontWeight;
use inkpress_core::{BoxFuture, FALLBACK_FONT_FAMILY, FontLoader};
use rusttype::Font;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    weight: u16,
    italic: bool,
}

/// Resolves family names to parsed faces.
pub struct FontResolver {
    db: RwLock<Database>,
    cache: Mutex<HashMap<FontKey, Option<Arc<Font<'static>>>>>,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FontResolver {
    /// A resolver with no faces.
    pub fn new() -> Self {
        Self::with_database(Database::new())
    }

    /// A resolver over the fonts installed on this machine.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} system font faces", db.len());
        Self::with_database(db)
    }

    /// Process-wide system resolver, loaded on first use.
    pub fn shared() -> &'static FontResolver {
        static SHARED: OnceLock<FontResolver> = OnceLock::new();
        SHARED.get_or_init(FontResolver::system)
    }

    fn with_database(db: Database) -> Self {
        Self {
            db: RwLock::new(db),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Register a TrueType/OpenType file. Returns the number of faces added.
    pub fn load_font_data(&self, data: Vec<u8>) -> RenderResult<usize> {
        if Font::try_from_bytes(&data).is_none() {
            return Err(RenderError::Font("not a TrueType/OpenType font".to_string()));
        }
        let added = {
            let mut db = self.db.write().unwrap_or_else(|p| p.into_inner());
            let before = db.len();
            db.load_font_data(data);
            db.len() - before
        };
        // Earlier misses may now succeed.
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|_, font| font.is_some());
        Ok(added)
    }

    /// Number of known faces.
    pub fn face_count(&self) -> usize {
        self.db.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Sorted family names of all known faces.
    pub fn families(&self) -> Vec<String> {
        let db = self.db.read().unwrap_or_else(|p| p.into_inner());
        let mut set = HashSet::new();
        for face in db.faces() {
            for (name, _) in &face.families {
                set.insert(name.clone());
            }
        }
        let mut out: Vec<_> = set.into_iter().collect();
        out.sort();
        out
    }

    /// Face for `family` at `weight`/`italic`, if one is available.
    pub fn resolve(&self, family: &str, weight: FontWeight, italic: bool) -> Option<Arc<Font<'static>>> {
        let key = FontKey {
            family: family.trim().to_string(),
            weight: weight.numeric(),
            italic,
        };

        if let Some(hit) = self.cache.lock().unwrap_or_else(|p| p.into_inner()).get(&key) {
            return hit.clone();
        }

        let loaded = self.load(&key).map(Arc::new);
        if loaded.is_none() {
            log::debug!("No face for {} {} italic={}", key.family, key.weight, key.italic);
        }
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key, loaded.clone());
        loaded
    }

    /// Like [`resolve`](Self::resolve), falling back to the generic sans-serif face.
    pub fn resolve_or_fallback(
        &self,
        family: &str,
        weight: FontWeight,
        italic: bool,
    ) -> Option<Arc<Font<'static>>> {
        self.resolve(family, weight, italic)
            .or_else(|| self.resolve(FALLBACK_FONT_FAMILY, weight, italic))
    }

    fn load(&self, key: &FontKey) -> Option<Font<'static>> {
        let families = [family_for(&key.family)];
        let query = Query {
            families: &families,
            weight: Weight(key.weight),
            stretch: Stretch::Normal,
            style: if key.italic { Style::Italic } else { Style::Normal },
        };

        let db = self.db.read().unwrap_or_else(|p| p.into_inner());
        let id = db.query(&query)?;
        db.with_face_data(id, |data, index| {
            Font::try_from_vec_and_index(data.to_vec(), index)
        })?
    }
}

fn family_for(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "" | "sans" | "sans-serif" => Family::SansSerif,
        "serif" => Family::Serif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

impl FontLoader for FontResolver {
    fn ensure_font_loaded(&self, family: &str, weight: FontWeight, italic: bool) -> BoxFuture<'_, bool> {
        let found = self.resolve(family, weight, italic).is_some();
        Box::pin(async move { found })
    }
}
