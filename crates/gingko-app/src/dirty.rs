// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::window_title;

/// Tracks whether the document changed since it was last clean and derives
/// the window title from that flag.
///
/// The flag only rises on a new store revision or an edit-buffer keystroke,
/// and only falls through [`DirtyTracker::mark_saved`]. Every method that
/// flips it returns the recomputed title so the caller can forward it to the
/// title sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyTracker {
    tree_name: String,
    dirty: bool,
    seen_revision: u64,
}

impl DirtyTracker {
    pub fn new(tree_name: impl Into<String>, revision: u64) -> Self {
        Self {
            tree_name: tree_name.into(),
            dirty: false,
            seen_revision: revision,
        }
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    pub fn title(&self) -> String {
        window_title(&self.tree_name, self.dirty)
    }

    pub fn observe(&mut self, revision: u64) -> Option<String> {
        if revision == self.seen_revision {
            return None;
        }
        self.seen_revision = revision;
        self.raise()
    }

    /// Uncommitted buffer input counts as a modification.
    pub fn note_buffer_edit(&mut self) -> Option<String> {
        self.raise()
    }

    pub fn mark_saved(&mut self, revision: u64) -> Option<String> {
        self.seen_revision = revision;
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        debug!(tree = %self.tree_name, "document clean");
        Some(self.title())
    }

    fn raise(&mut self) -> Option<String> {
        if self.dirty {
            return None;
        }
        self.dirty = true;
        debug!(tree = %self.tree_name, "document dirty");
        Some(self.title())
    }
}
