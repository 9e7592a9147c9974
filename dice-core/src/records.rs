//! Latest completed roll per slot.

use crate::context::SlotId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The landed face and the authoritative result of one completed roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRecord {
    pub base_roll: i32,
    pub final_roll: i32,
}

impl RollRecord {
    pub fn new(base_roll: i32, final_roll: i32) -> Self {
        Self {
            base_roll,
            final_roll,
        }
    }

    /// Whether modifiers or a decision changed the landed face.
    pub fn was_modified(&self) -> bool {
        self.base_roll != self.final_roll
    }
}

/// Keeps only the most recent record for each slot. No history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordStore {
    records: HashMap<SlotId, RollRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any previous one for the slot.
    pub fn put(&mut self, slot: SlotId, base_roll: i32, final_roll: i32) -> RollRecord {
        let record = RollRecord::new(base_roll, final_roll);
        self.records.insert(slot, record);
        record
    }

    pub fn get(&self, slot: SlotId) -> Option<RollRecord> {
        self.records.get(&slot).copied()
    }

    /// Evict the record for a slot leaving play.
    pub fn remove(&mut self, slot: SlotId) -> Option<RollRecord> {
        self.records.remove(&slot)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
