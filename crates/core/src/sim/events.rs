//! Terrain-edit event queue with an explicit one-tick delay.
//! Edits pushed during tick N are drained at the start of tick N+1, after
//! the grid mutation they describe is visible to passability queries and
//! before any controller runs that tick.

use crate::types::BlockPlaced;

#[derive(Debug, Default)]
pub(super) struct EditQueue {
    pending: Vec<BlockPlaced>,
}

impl EditQueue {
    pub(super) fn push(&mut self, edit: BlockPlaced) {
        self.pending.push(edit);
    }

    /// Called once at the start of every tick. Yields everything queued
    /// since the previous drain; each edit is delivered exactly once.
    pub(super) fn drain(&mut self) -> Vec<BlockPlaced> {
        std::mem::take(&mut self.pending)
    }
}
