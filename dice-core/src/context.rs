//! Rolling slots and per-resolution context.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one in-play die.
///
/// Keys range computation, record storage, and effect targeting. A slot is
/// minted when a die enters active play and retired when it leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub Uuid);

impl SlotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot handed to value modifiers for a single resolution.
///
/// Built fresh for every call; never stored past the roll it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollContext {
    /// Current turn number (starts at 1 by default).
    pub turn: u32,
    /// Final value of the last completed roll in this session, if any.
    pub previous_final: Option<i32>,
    /// The slot being resolved.
    pub slot: SlotId,
}

impl RollContext {
    pub fn new(turn: u32, previous_final: Option<i32>, slot: SlotId) -> Self {
        Self {
            turn,
            previous_final,
            slot,
        }
    }
}
