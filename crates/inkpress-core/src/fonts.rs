//! Deferred text updates that wait for a font to be available.
//!
//! A patch that changes a text object's family, weight or style is parked per
//! object under a ticket. The host loads the font and answers with a
//! [`FontResolution`]; only an answer carrying the object's latest ticket applies.

use crate::objects::{FontWeight, ObjectId, ObjectPatch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`FontLoader`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Family substituted when a requested font cannot be loaded.
pub const FALLBACK_FONT_FAMILY: &str = "sans-serif";

/// A font the host must make available before a parked patch can apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRequest {
    pub ticket: u64,
    pub object_id: ObjectId,
    pub family: String,
    pub weight: FontWeight,
    pub italic: bool,
}

/// The host's answer to a [`FontRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontResolution {
    pub ticket: u64,
    pub object_id: ObjectId,
    /// False when the font could not be loaded.
    pub loaded: bool,
}

/// Loads fonts on behalf of the editor.
pub trait FontLoader {
    /// Make the face available. Resolves to false when it cannot be found.
    fn ensure_font_loaded(&self, family: &str, weight: FontWeight, italic: bool) -> BoxFuture<'_, bool>;
}

#[derive(Debug, Clone)]
struct PendingUpdate {
    ticket: u64,
    patch: ObjectPatch,
}

/// Per-object slots of parked patches, plus the outbox of unsent requests.
#[derive(Debug, Clone, Default)]
pub struct PendingFonts {
    next_ticket: u64,
    slots: HashMap<ObjectId, PendingUpdate>,
    outbox: Vec<FontRequest>,
}

impl PendingFonts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a patch for `object_id`, superseding any older one. Returns the ticket.
    pub fn park(
        &mut self,
        object_id: ObjectId,
        patch: ObjectPatch,
        family: String,
        weight: FontWeight,
        italic: bool,
    ) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if self
            .slots
            .insert(object_id, PendingUpdate { ticket, patch })
            .is_some()
        {
            log::debug!("Font update for {object_id} superseded by ticket {ticket}");
        }
        // Requests for the same object that were never sent are obsolete.
        self.outbox.retain(|r| r.object_id != object_id);
        self.outbox.push(FontRequest {
            ticket,
            object_id,
            family,
            weight,
            italic,
        });
        ticket
    }

    /// Requests not yet handed to the host.
    pub fn take_requests(&mut self) -> Vec<FontRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Remove and return the parked patch if the resolution is current.
    pub fn settle(&mut self, resolution: &FontResolution) -> Option<ObjectPatch> {
        match self.slots.get(&resolution.object_id) {
            Some(pending) if pending.ticket == resolution.ticket => self
                .slots
                .remove(&resolution.object_id)
                .map(|pending| pending.patch),
            Some(pending) => {
                log::debug!(
                    "Dropping stale font resolution {} for {} (current ticket {})",
                    resolution.ticket,
                    resolution.object_id,
                    pending.ticket
                );
                None
            }
            None => None,
        }
    }

    /// Drop the slot of a deleted object.
    pub fn forget(&mut self, object_id: ObjectId) {
        self.slots.remove(&object_id);
        self.outbox.retain(|r| r.object_id != object_id);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.outbox.clear();
    }

    /// Whether an update is waiting for `object_id`.
    pub fn is_pending(&self, object_id: ObjectId) -> bool {
        self.slots.contains_key(&object_id)
    }

    /// Number of parked updates.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn family_patch(family: &str) -> ObjectPatch {
        ObjectPatch {
            font_family: Some(family.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_park_and_settle() {
        let mut fonts = PendingFonts::new();
        let id = Uuid::new_v4();
        let ticket = fonts.park(id, family_patch("Lato"), "Lato".into(), FontWeight::Regular, false);

        let requests = fonts.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].family, "Lato");
        assert!(fonts.take_requests().is_empty());

        let patch = fonts.settle(&FontResolution {
            ticket,
            object_id: id,
            loaded: true,
        });
        assert_eq!(patch, Some(family_patch("Lato")));
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut fonts = PendingFonts::new();
        let id = Uuid::new_v4();
        let old = fonts.park(id, family_patch("A"), "A".into(), FontWeight::Regular, false);
        let new = fonts.park(id, family_patch("B"), "B".into(), FontWeight::Bold, true);
        assert!(new > old);

        let requests = fonts.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ticket, new);

        let stale = FontResolution {
            ticket: old,
            object_id: id,
            loaded: true,
        };
        assert!(fonts.settle(&stale).is_none());
        assert!(fonts.is_pending(id));

        let current = FontResolution {
            ticket: new,
            object_id: id,
            loaded: true,
        };
        assert_eq!(fonts.settle(&current), Some(family_patch("B")));
    }

    #[test]
    fn test_forget_drops_slot() {
        let mut fonts = PendingFonts::new();
        let id = Uuid::new_v4();
        let ticket = fonts.park(id, family_patch("A"), "A".into(), FontWeight::Regular, false);
        fonts.forget(id);
        assert!(fonts.take_requests().is_empty());
        let resolution = FontResolution {
            ticket,
            object_id: id,
            loaded: true,
        };
        assert!(fonts.settle(&resolution).is_none());
    }
}
