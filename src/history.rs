//! Linear undo/redo history over ink-surface snapshots.
//!
//! One [`HistoryLog`] is a sequence of snapshots plus a cursor. Saving
//! while the cursor sits behind the end discards the forward (redo) branch
//! first — standard linear-undo semantics. Undo and redo move the cursor
//! only; `save` is the single operation that can shrink the log.
//!
//! [`PageHistories`] keys one log per page. Keeping the logs separate means
//! undoing on page 3 can never resurrect a snapshot drawn on page 7, which
//! a single shared log silently allows.

use crate::ink::SceneSnapshot;
use std::collections::HashMap;

/// A linear undo/redo log with a cursor.
///
/// Cursor invariant: `None` while the log is empty, otherwise a valid
/// index into the snapshot list.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    snapshots: Vec<SceneSnapshot>,
    cursor: Option<usize>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Current cursor position, if any.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Append a snapshot, pruning any redo branch beyond the cursor.
    ///
    /// Saving a snapshot equal to the current one is suppressed: navigation
    /// saves unconditionally, and without suppression every page visit
    /// would append a duplicate entry the user then has to undo through.
    pub fn save(&mut self, snapshot: SceneSnapshot) {
        if self.current() == Some(&snapshot) {
            return;
        }
        if let Some(cursor) = self.cursor {
            self.snapshots.truncate(cursor + 1);
        }
        self.snapshots.push(snapshot);
        self.cursor = Some(self.snapshots.len() - 1);
    }

    /// The snapshot under the cursor. Non-mutating.
    pub fn current(&self) -> Option<&SceneSnapshot> {
        self.cursor.and_then(|c| self.snapshots.get(c))
    }

    /// Step the cursor back and return the snapshot now under it.
    ///
    /// A no-op (returning `None`) at the first entry or on an empty log —
    /// there is nothing before the first state.
    pub fn undo(&mut self) -> Option<&SceneSnapshot> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                self.current()
            }
            _ => None,
        }
    }

    /// Step the cursor forward and return the snapshot now under it.
    ///
    /// A no-op (returning `None`) at the last entry or on an empty log.
    pub fn redo(&mut self) -> Option<&SceneSnapshot> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.snapshots.len() => {
                self.cursor = Some(cursor + 1);
                self.current()
            }
            _ => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.snapshots.len())
    }
}

/// Undo/redo logs keyed by 1-based page number.
#[derive(Debug, Clone, Default)]
pub struct PageHistories {
    logs: HashMap<usize, HistoryLog>,
}

impl PageHistories {
    pub fn new() -> Self {
        Self::default()
    }

    /// The log for a page, creating an empty one on first access.
    pub fn log_mut(&mut self, page: usize) -> &mut HistoryLog {
        self.logs.entry(page).or_default()
    }

    /// The log for a page, if the page has ever been saved to or visited.
    pub fn log(&self, page: usize) -> Option<&HistoryLog> {
        self.logs.get(&page)
    }

    /// The snapshot currently in effect for a page.
    pub fn current(&self, page: usize) -> Option<&SceneSnapshot> {
        self.logs.get(&page).and_then(|log| log.current())
    }
}
