//! Process-local snapshot store.

use super::{NoteStore, StoreResult};
use crate::model::record::NoteRecord;
use serde_json::Value;

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteStore {
    snapshot: Vec<Value>,
    save_count: usize,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw records, as if loaded from elsewhere.
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            snapshot: records,
            save_count: 0,
        }
    }

    pub fn snapshot(&self) -> &[Value] {
        &self.snapshot
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl NoteStore for MemoryNoteStore {
    fn load(&self) -> StoreResult<Vec<Value>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, records: &[NoteRecord]) -> StoreResult<()> {
        let snapshot = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.snapshot = snapshot;
        self.save_count += 1;
        Ok(())
    }
}
