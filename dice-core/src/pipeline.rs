//! The roll resolution pipeline.
//!
//! A landed face goes through these steps:
//! 1. Aggregate effects for the slot (object, items, persona, consumables)
//! 2. Apply synchronous value modifiers
//! 3. If a decision effect is active, suspend until the player chooses
//! 4. Write the roll record, consume one-shot buffs, and notify the listener
//!
//! Every pipeline is an explicit value. It owns its record store, its pending
//! decisions and its turn clock; effect owners are borrowed per call through
//! [`EffectSources`].

use crate::config::PipelineConfig;
use crate::context::{RollContext, SlotId};
use crate::coordinator::{
    Coordinator, DecisionPrompt, DecisionRequest, PendingDecision, ResolutionState,
};
use crate::dice::FaceRange;
use crate::effect::EffectKind;
use crate::range::legal_range;
use crate::records::{RecordStore, RollRecord};
use crate::resolver::{first_decision, resolve_value};
use crate::sources::{aggregate, EffectSources};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Errors from driving a roll.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RollError {
    #[error("No die placed in slot {0}")]
    UnknownSlot(SlotId),

    #[error("Slot {0} is already awaiting a decision")]
    AwaitingChoice(SlotId),

    #[error("No decision pending for slot {0}")]
    NoPendingDecision(SlotId),

    #[error("Option {index} is out of range ({available} available)")]
    InvalidOption { index: usize, available: usize },
}

/// Receives each completed roll exactly once.
pub trait RollListener {
    fn roll_completed(&mut self, slot: SlotId, record: RollRecord);
}

/// A completed roll as reported downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRoll {
    pub slot: SlotId,
    pub record: RollRecord,
}

/// Listener that forwards completed rolls over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<CompletedRoll>,
}

impl ChannelListener {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CompletedRoll>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl RollListener for ChannelListener {
    fn roll_completed(&mut self, slot: SlotId, record: RollRecord) {
        if self.sender.send(CompletedRoll { slot, record }).is_err() {
            debug!(%slot, "Roll listener channel closed");
        }
    }
}

/// Result of handing a landed face to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollOutcome {
    /// The roll is final and recorded.
    Completed(RollRecord),
    /// The roll is suspended until the player picks an option.
    AwaitingChoice(DecisionRequest),
}

impl RollOutcome {
    pub fn record(&self) -> Option<RollRecord> {
        match self {
            RollOutcome::Completed(record) => Some(*record),
            RollOutcome::AwaitingChoice(_) => None,
        }
    }
}

/// Resolves landed faces into roll records for any number of slots.
///
/// The pipeline owns the per-slot bookkeeping: latest records, pending
/// decisions, snap markers and the turn clock. Effect owners are passed in
/// per call, so one pipeline can serve any [`EffectSources`] implementation.
/// `P` shows decisions to the player; `L` hears about each completed roll
/// exactly once.
pub struct RollPipeline<P: DecisionPrompt, L: RollListener> {
    config: PipelineConfig,
    rng: StdRng,
    prompt: P,
    listener: L,
    records: RecordStore,
    coordinator: Coordinator,
    turn: u32,
    previous_final: Option<i32>,
    /// Slots whose post-land snap was requested and not yet answered.
    pub(crate) snapped: HashSet<SlotId>,
}

impl<P: DecisionPrompt, L: RollListener> RollPipeline<P, L> {
    pub fn new(config: PipelineConfig, prompt: P, listener: L) -> Self {
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            turn: config.starting_turn,
            config,
            rng,
            prompt,
            listener,
            records: RecordStore::new(),
            coordinator: Coordinator::new(),
            previous_final: None,
            snapped: HashSet::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn prompt_mut(&mut self) -> &mut P {
        &mut self.prompt
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Override the turn counter, e.g. when the host's turn system skips.
    pub fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    pub fn previous_final(&self) -> Option<i32> {
        self.previous_final
    }

    /// Fresh context for a roll in `slot`.
    pub fn context(&self, slot: SlotId) -> RollContext {
        RollContext::new(self.turn, self.previous_final, slot)
    }

    /// Legal faces for the next roll in `slot`.
    ///
    /// `None` when no die is placed there. The range itself may be empty.
    pub fn legal_range<S: EffectSources + ?Sized>(
        &self,
        sources: &S,
        slot: SlotId,
    ) -> Option<FaceRange> {
        aggregate(sources, slot).map(|stack| legal_range(&stack))
    }

    /// The value `raw` would resolve to, without recording anything.
    ///
    /// Shares its computation with final resolution. Decision effects are not
    /// consulted.
    pub fn preview<S: EffectSources + ?Sized>(
        &self,
        sources: &S,
        slot: SlotId,
        raw: i32,
    ) -> Option<i32> {
        let stack = aggregate(sources, slot)?;
        Some(resolve_value(&stack, raw, &self.context(slot)))
    }

    /// Resolve a landed face.
    ///
    /// Completes immediately unless a decision effect is active, in which case
    /// the request is presented and the slot waits for
    /// [`submit_choice`](Self::submit_choice). A roll on a slot that is
    /// already waiting is rejected.
    ///
    /// One-shot consumables are spent by the roll that resolves them: they are
    /// cleared on completion, or on suspension when a decision is pending, so a
    /// roll on another slot never sees them again.
    pub fn resolve<S: EffectSources + ?Sized>(
        &mut self,
        sources: &mut S,
        slot: SlotId,
        raw: i32,
    ) -> Result<RollOutcome, RollError> {
        if self.coordinator.state(slot) == ResolutionState::AwaitingChoice {
            warn!(%slot, raw, "Rejected roll for slot already awaiting a decision");
            return Err(RollError::AwaitingChoice(slot));
        }
        // Whatever face arrives now answers any outstanding snap.
        self.snapped.remove(&slot);

        let ctx = self.context(slot);
        let (resolved, decision) = {
            let stack = aggregate(&*sources, slot).ok_or(RollError::UnknownSlot(slot))?;
            let resolved = resolve_value(&stack, raw, &ctx);
            let decision = first_decision(&stack).map(|effect| {
                (
                    effect.name.clone(),
                    effect.kind.clone(),
                    legal_range(&stack),
                    stack.die.native_range(),
                )
            });
            (resolved, decision)
        };
        debug!(%slot, raw, resolved, turn = ctx.turn, "Resolved synchronous modifiers");

        let Some((effect, kind, range, native)) = decision else {
            sources.clear_consumables();
            let record = self.complete(slot, raw, resolved);
            return Ok(RollOutcome::Completed(record));
        };

        let options = kind.decision_options(
            resolved,
            range,
            native,
            &mut self.rng,
            self.config.resample_attempts,
        );
        let request = DecisionRequest {
            slot,
            effect,
            prompt: self.prompt_text(&kind),
            options,
        };

        let parked = self.coordinator.suspend(PendingDecision {
            request: request.clone(),
            base: raw,
            resolved,
        });
        if !parked {
            return Err(RollError::AwaitingChoice(slot));
        }
        sources.clear_consumables();

        if let Err(err) = self.prompt.present(&request) {
            self.coordinator.take(slot);
            warn!(
                %slot,
                effect = %request.effect,
                error = %err,
                "Decision prompt unavailable; completing with resolved value"
            );
            let record = self.complete(slot, raw, resolved);
            return Ok(RollOutcome::Completed(record));
        }

        debug!(
            %slot,
            effect = %request.effect,
            options = request.options.len(),
            "Roll suspended awaiting decision"
        );
        Ok(RollOutcome::AwaitingChoice(request))
    }

    /// Complete a suspended roll with the option at `index`.
    ///
    /// An out-of-range index leaves the decision pending.
    pub fn submit_choice(&mut self, slot: SlotId, index: usize) -> Result<RollRecord, RollError> {
        let value = {
            let pending = self
                .coordinator
                .pending(slot)
                .ok_or(RollError::NoPendingDecision(slot))?;
            pending
                .option_value(index)
                .ok_or(RollError::InvalidOption {
                    index,
                    available: pending.request.options.len(),
                })?
        };
        let pending = self
            .coordinator
            .take(slot)
            .ok_or(RollError::NoPendingDecision(slot))?;
        debug!(%slot, index, value, "Decision received");
        Ok(self.complete(slot, pending.base, value))
    }

    /// Give up on a pending decision, completing with the value resolved
    /// before the decision was asked. Used when the popup goes away after a
    /// request was already shown.
    pub fn abandon_decision(&mut self, slot: SlotId) -> Result<RollRecord, RollError> {
        let pending = self
            .coordinator
            .take(slot)
            .ok_or(RollError::NoPendingDecision(slot))?;
        warn!(%slot, effect = %pending.request.effect, "Decision abandoned; completing with resolved value");
        Ok(self.complete(slot, pending.base, pending.resolved))
    }

    pub fn resolution_state(&self, slot: SlotId) -> ResolutionState {
        match self.coordinator.state(slot) {
            ResolutionState::Idle if self.records.get(slot).is_some() => ResolutionState::Completed,
            state => state,
        }
    }

    pub fn pending_decision(&self, slot: SlotId) -> Option<&DecisionRequest> {
        self.coordinator.pending(slot).map(|pending| &pending.request)
    }

    /// Latest completed `(base, final)` pair for a slot.
    pub fn record(&self, slot: SlotId) -> Option<RollRecord> {
        self.records.get(slot)
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Forget everything about a slot leaving play.
    pub fn clear_slot(&mut self, slot: SlotId) {
        self.records.remove(slot);
        self.snapped.remove(&slot);
        if let Some(pending) = self.coordinator.take(slot) {
            warn!(%slot, effect = %pending.request.effect, "Cleared slot with a pending decision");
        }
    }

    fn prompt_text(&self, kind: &EffectKind) -> String {
        match kind {
            EffectKind::Nudge => self.config.nudge_prompt.clone(),
            _ => self.config.destiny_prompt.clone(),
        }
    }

    /// The single completion step shared by every path.
    fn complete(&mut self, slot: SlotId, base: i32, final_roll: i32) -> RollRecord {
        let record = self.records.put(slot, base, final_roll);
        self.snapped.remove(&slot);
        self.previous_final = Some(final_roll);
        self.turn = self.turn.saturating_add(1);
        info!(%slot, base, final_roll, "Roll completed");
        self.listener.roll_completed(slot, record);
        record
    }
}
