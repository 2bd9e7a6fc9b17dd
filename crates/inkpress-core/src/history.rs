//! Snapshot-based linear undo/redo.

use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of snapshots kept.
pub const MAX_UNDO_HISTORY: usize = 50;

/// An immutable serialized scene.
pub type Snapshot = Arc<str>;

/// Linear history of scene snapshots with a cursor.
///
/// The entry under the cursor always mirrors the live scene. Committing while
/// the cursor is not at the tail drops the redo branch.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl History {
    /// Create an empty history holding at most `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Drop everything and start from a single snapshot.
    pub fn reset(&mut self, initial: Snapshot) {
        self.entries.clear();
        self.entries.push_back(initial);
        self.cursor = 0;
    }

    /// Record a new state after the cursor.
    pub fn commit(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(snapshot);

        // Limit history size
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        log::debug!("History commit, {} entries", self.entries.len());
    }

    /// Step back. Returns the snapshot to restore.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        log::debug!("Undo to entry {}", self.cursor);
        self.entries.get(self.cursor).cloned()
    }

    /// Step forward. Returns the snapshot to restore.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        log::debug!("Redo to entry {}", self.cursor);
        self.entries.get(self.cursor).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0 && !self.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }
}
