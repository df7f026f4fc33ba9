//! Navigation Cursor: read-only review through history.
//!
//! The cursor is a plain index clamped to `0..=max`. What the index points
//! into (recorded positions, or solution moves from the puzzle start) is
//! decided by the session state for the current mode.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationCursor {
    index: usize,
}

impl NavigationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Step one back. No-op at 0; returns whether the cursor moved.
    pub fn step_back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step one forward, up to `max`. Returns whether the cursor moved.
    pub fn step_forward(&mut self, max: usize) -> bool {
        if self.index >= max {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn jump_to(&mut self, index: usize) {
        self.index = index;
    }

    /// Pull the cursor back inside `0..=max` after history shrank.
    pub fn clamp(&mut self, max: usize) {
        self.index = self.index.min(max);
    }
}
