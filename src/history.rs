//! Linear undo/redo history.
//!
//! Two stacks of snapshots: `past` holds states that can be restored with
//! [`History::undo`], `future` holds states that were undone and can be
//! restored with [`History::redo`]. Recording a new snapshot invalidates the
//! future.

use std::collections::VecDeque;

/// Undo/redo stacks over snapshots of type `T`.
///
/// The caller owns the current state; `undo` and `redo` swap it with the
/// top of the relevant stack.
///
/// # Example
///
/// ```rust
/// use exif_scrub::history::History;
///
/// let mut history = History::new(0);
/// let mut text = String::from("a");
///
/// history.record(text.clone());
/// text.push('b');
///
/// assert!(history.undo(&mut text));
/// assert_eq!(text, "a");
/// assert!(history.redo(&mut text));
/// assert_eq!(text, "ab");
/// ```
#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<T>,
    future: Vec<T>,
    /// Maximum depth of `past`. `0` means unbounded.
    limit: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Remember `snapshot` as the state before a new action.
    ///
    /// Clears the redo stack. When the limit is reached the oldest snapshot is dropped.
    pub fn record(&mut self, snapshot: T) {
        self.future.clear();
        self.past.push_back(snapshot);
        if self.limit > 0 {
            while self.past.len() > self.limit {
                self.past.pop_front();
            }
        }
    }

    /// Step back: `current` becomes the last recorded snapshot.
    ///
    /// Returns `false` (leaving `current` alone) when there is nothing to undo.
    pub fn undo(&mut self, current: &mut T) -> bool {
        match self.past.pop_back() {
            Some(previous) => {
                self.future.push(std::mem::replace(current, previous));
                true
            }
            None => false,
        }
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: &mut T) -> bool {
        match self.future.pop() {
            Some(next) => {
                self.past.push_back(std::mem::replace(current, next));
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
