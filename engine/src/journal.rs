//! FILENAME: engine/src/journal.rs
//! PURPOSE: Commit/rollback checkpointing for the table collection.
//! CONTEXT: A single-level journal: `commit` snapshots the entire
//! collection, `rollback` restores the last snapshot. The checkpoint
//! survives a rollback, so repeated rollbacks return to the same committed
//! state rather than walking further back.

use crate::collection::TableCollection;

#[derive(Default)]
pub struct Journal {
    checkpoint: Option<TableCollection>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tables` as the state rollback returns to.
    pub fn commit(&mut self, tables: &TableCollection) {
        self.checkpoint = Some(tables.clone());
    }

    /// A copy of the last committed state, or None when nothing has been
    /// committed yet. The checkpoint itself is retained.
    pub fn rollback(&self) -> Option<TableCollection> {
        self.checkpoint.clone()
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }
}
