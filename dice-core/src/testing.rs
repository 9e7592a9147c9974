//! Testing utilities for the roll pipeline.
//!
//! This module provides tools for integration testing:
//! - `ScriptedPrompt` records decision requests (or refuses them)
//! - `RecordingListener` and `RecordingPhysics` capture outbound calls
//! - `TestHarness` bundles a table and a pipeline for scripted scenarios

use crate::config::PipelineConfig;
use crate::context::SlotId;
use crate::coordinator::{DecisionPrompt, DecisionRequest, PromptError, ResolutionState};
use crate::dice::{DieType, FaceRange};
use crate::effect::Effect;
use crate::pipeline::{RollError, RollListener, RollOutcome, RollPipeline};
use crate::records::RollRecord;
use crate::settle::PhysicsDriver;
use crate::sources::{HeldItem, Persona, RolledDie};
use crate::table::RollTable;

/// A prompt that remembers every request it was shown.
#[derive(Debug, Clone)]
pub struct ScriptedPrompt {
    requests: Vec<DecisionRequest>,
    available: bool,
}

impl ScriptedPrompt {
    /// A prompt that accepts every request.
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            available: true,
        }
    }

    /// A prompt that refuses every request.
    pub fn unavailable() -> Self {
        Self {
            requests: Vec::new(),
            available: false,
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn requests(&self) -> &[DecisionRequest] {
        &self.requests
    }

    pub fn last_request(&self) -> Option<&DecisionRequest> {
        self.requests.last()
    }
}

impl Default for ScriptedPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionPrompt for ScriptedPrompt {
    fn present(&mut self, request: &DecisionRequest) -> Result<(), PromptError> {
        if !self.available {
            return Err(PromptError::Unavailable);
        }
        self.requests.push(request.clone());
        Ok(())
    }
}

/// Listener that keeps every completion in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    completions: Vec<(SlotId, RollRecord)>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completions(&self) -> Vec<(SlotId, RollRecord)> {
        self.completions.clone()
    }

    /// How many completions were reported for one slot.
    pub fn count_for(&self, slot: SlotId) -> usize {
        self.completions.iter().filter(|(s, _)| *s == slot).count()
    }
}

impl RollListener for RecordingListener {
    fn roll_completed(&mut self, slot: SlotId, record: RollRecord) {
        self.completions.push((slot, record));
    }
}

/// Physics driver that records instructions instead of moving anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingPhysics {
    pub steers: Vec<(SlotId, i32)>,
    pub snaps: Vec<(SlotId, i32)>,
}

impl RecordingPhysics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhysicsDriver for RecordingPhysics {
    fn steer_toward(&mut self, slot: SlotId, face: i32) {
        self.steers.push((slot, face));
    }

    fn snap_to(&mut self, slot: SlotId, face: i32) {
        self.snaps.push((slot, face));
    }
}

/// Test harness for scripted roll scenarios.
pub struct TestHarness {
    pub table: RollTable,
    pub pipeline: RollPipeline<ScriptedPrompt, RecordingListener>,
}

impl TestHarness {
    /// Create a harness with a seeded pipeline.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::new().with_seed(0xD1CE))
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            table: RollTable::new(),
            pipeline: RollPipeline::new(config, ScriptedPrompt::new(), RecordingListener::new()),
        }
    }

    /// Place a die carrying `effects` and return its slot.
    pub fn place(&mut self, die: DieType, effects: Vec<Effect>) -> SlotId {
        let mut rolled = RolledDie::new(die);
        rolled.effects = effects;
        self.table.place(rolled)
    }

    pub fn hold(&mut self, name: &str, effects: Vec<Effect>) {
        let mut item = HeldItem::new(name);
        item.effects = effects;
        self.table.add_item(item);
    }

    pub fn persona(&mut self, name: &str, effects: Vec<Effect>) {
        let mut persona = Persona::new(name);
        persona.effects = effects;
        self.table.set_persona(persona);
    }

    pub fn buff(&mut self, effect: Effect) {
        self.table.grant_buff(effect);
    }

    pub fn range(&self, slot: SlotId) -> Option<FaceRange> {
        self.pipeline.legal_range(&self.table, slot)
    }

    pub fn preview(&self, slot: SlotId, raw: i32) -> Option<i32> {
        self.pipeline.preview(&self.table, slot, raw)
    }

    pub fn roll(&mut self, slot: SlotId, raw: i32) -> Result<RollOutcome, RollError> {
        self.pipeline.resolve(&mut self.table, slot, raw)
    }

    pub fn choose(&mut self, slot: SlotId, index: usize) -> Result<RollRecord, RollError> {
        self.pipeline.submit_choice(slot, index)
    }

    pub fn record(&self, slot: SlotId) -> Option<RollRecord> {
        self.pipeline.record(slot)
    }

    pub fn prompt(&self) -> &ScriptedPrompt {
        self.pipeline.prompt()
    }

    pub fn listener(&self) -> &RecordingListener {
        self.pipeline.listener()
    }

    /// Assert the slot is waiting on the player.
    pub fn assert_awaiting(&self, slot: SlotId) {
        assert_eq!(
            self.pipeline.resolution_state(slot),
            ResolutionState::AwaitingChoice,
            "slot {slot} should be awaiting a decision"
        );
    }

    /// Assert the latest record for a slot.
    pub fn assert_record(&self, slot: SlotId, base: i32, final_roll: i32) {
        assert_eq!(
            self.record(slot),
            Some(RollRecord::new(base, final_roll)),
            "unexpected record for slot {slot}"
        );
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
