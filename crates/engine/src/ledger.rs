//! Version history and linear undo/redo.
//!
//! The ledger observes completed artifact states. The persisted entry list
//! is cumulative and keyed per artifact; the undo/redo stack is a separate
//! single linear history seeded by the same recordings.

use chrono::Utc;
use pageforge_core::{VersionEntry, MAX_VERSION_ENTRIES};
use uuid::Uuid;

/// One state on the undo/redo stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoState {
    pub artifact_id: String,
    pub content: String,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct VersionLedger {
    entries: Vec<VersionEntry>,
    /// Last element is the current state.
    undo: Vec<UndoState>,
    redo: Vec<UndoState>,
}

impl VersionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed artifact's content.
    ///
    /// Returns the new entry, or `None` when the artifact's last recorded
    /// entry already holds identical content (no-op refinements leave no
    /// trace). Every accepted recording also becomes the current undo
    /// state, discarding any redo branch.
    pub fn record(
        &mut self,
        artifact_id: &str,
        content: &str,
        label: &str,
    ) -> Option<VersionEntry> {
        if self.latest_for(artifact_id).is_some_and(|e| e.content == content) {
            tracing::debug!(%artifact_id, "identical content; version entry skipped");
            return None;
        }
        self.push_state(artifact_id, content, label);
        Some(self.append_entry(artifact_id, content, label))
    }

    /// Restore previously recorded content onto the live artifact.
    ///
    /// Restoring is itself undoable, so the stack always gains a state
    /// labeled "restored" even when the content matches the last entry
    /// (in which case no duplicate entry is appended).
    pub fn restore(&mut self, artifact_id: &str, content: &str) -> Option<VersionEntry> {
        let label = "restored";
        let entry = if self.latest_for(artifact_id).is_some_and(|e| e.content == content) {
            None
        } else {
            Some(self.append_entry(artifact_id, content, label))
        };
        self.push_state(artifact_id, content, label);
        entry
    }

    /// Step back one state. Returns the state now current.
    pub fn undo(&mut self) -> Option<UndoState> {
        if self.undo.len() < 2 {
            return None;
        }
        let current = self.undo.pop()?;
        self.redo.push(current);
        self.undo.last().cloned()
    }

    /// Step forward one state previously undone.
    pub fn redo(&mut self) -> Option<UndoState> {
        let state = self.redo.pop()?;
        self.undo.push(state);
        self.undo.last().cloned()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// All entries for one artifact, oldest first.
    pub fn entries_for<'a>(
        &'a self,
        artifact_id: &'a str,
    ) -> impl Iterator<Item = &'a VersionEntry> {
        self.entries.iter().filter(move |e| e.artifact_id == artifact_id)
    }

    #[must_use]
    pub fn entry(&self, entry_id: &str) -> Option<&VersionEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    #[must_use]
    pub fn latest_for(&self, artifact_id: &str) -> Option<&VersionEntry> {
        self.entries.iter().rev().find(|e| e.artifact_id == artifact_id)
    }

    fn append_entry(&mut self, artifact_id: &str, content: &str, label: &str) -> VersionEntry {
        let entry = VersionEntry {
            id: Uuid::new_v4().to_string(),
            artifact_id: artifact_id.to_owned(),
            content: content.to_owned(),
            label: label.to_owned(),
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        if self.entries.len() > MAX_VERSION_ENTRIES {
            let excess = self.entries.len() - MAX_VERSION_ENTRIES;
            self.entries.drain(..excess);
        }
        entry
    }

    fn push_state(&mut self, artifact_id: &str, content: &str, label: &str) {
        self.undo.push(UndoState {
            artifact_id: artifact_id.to_owned(),
            content: content.to_owned(),
            label: label.to_owned(),
        });
        self.redo.clear();
    }
}
