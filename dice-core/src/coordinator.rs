//! Player decisions that suspend a roll.
//!
//! When the resolver meets an effect that needs the player to choose, the roll
//! moves from `Idle` to `AwaitingChoice`. The request is handed to a
//! [`DecisionPrompt`] and control returns to the host loop. The roll only
//! completes when the host submits the player's choice, and each pending
//! decision can be taken exactly once.
//!
//! A prompt that cannot be shown is not fatal: the pipeline fails closed and
//! completes with the value it had already resolved.

use crate::context::SlotId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from presenting a decision.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Decision prompt unavailable")]
    Unavailable,
}

/// One labeled choice and the value it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub label: String,
    pub value: i32,
}

impl DecisionOption {
    pub fn new(label: impl Into<String>, value: i32) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Everything a popup needs to ask the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub slot: SlotId,
    /// Name of the effect asking.
    pub effect: String,
    pub prompt: String,
    pub options: Vec<DecisionOption>,
}

/// Shows a decision to the player.
///
/// Implementations only *present* the request; the answer comes back later
/// through the pipeline's choice submission.
pub trait DecisionPrompt {
    fn present(&mut self, request: &DecisionRequest) -> Result<(), PromptError>;
}

/// Prompt that forwards requests over an unbounded channel.
///
/// The receiving half belongs to whatever renders popups. Once it is dropped
/// every request reports [`PromptError::Unavailable`].
#[derive(Debug, Clone)]
pub struct ChannelPrompt {
    sender: mpsc::UnboundedSender<DecisionRequest>,
}

impl ChannelPrompt {
    /// Create a prompt and the receiver that will see its requests.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DecisionRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DecisionPrompt for ChannelPrompt {
    fn present(&mut self, request: &DecisionRequest) -> Result<(), PromptError> {
        self.sender
            .send(request.clone())
            .map_err(|_| PromptError::Unavailable)
    }
}

/// Prompt for hosts with no popup at all. Every decision fails closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl DecisionPrompt for NoPrompt {
    fn present(&mut self, _request: &DecisionRequest) -> Result<(), PromptError> {
        Err(PromptError::Unavailable)
    }
}

/// Where a slot is in the resolution state machine.
///
/// `Idle -> AwaitingChoice -> Completed`, or straight from `Idle` to
/// `Completed` when no decision is needed. A completed slot rolls again from
/// `Completed` the same way it would from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    /// No roll has completed since the slot entered play.
    Idle,
    AwaitingChoice,
    /// The latest roll is recorded.
    Completed,
}

/// A roll suspended on a player decision.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    pub request: DecisionRequest,
    /// The landed face.
    pub base: i32,
    /// Value after synchronous modifiers; used if the decision is abandoned.
    pub resolved: i32,
}

impl PendingDecision {
    /// Value of the option at `index`, if there is one.
    pub fn option_value(&self, index: usize) -> Option<i32> {
        self.request.options.get(index).map(|option| option.value)
    }
}

/// Holds at most one pending decision per slot.
#[derive(Debug, Default)]
pub struct Coordinator {
    pending: HashMap<SlotId, PendingDecision>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `AwaitingChoice` while a decision is parked, `Idle` otherwise. The
    /// coordinator does not track completions.
    pub fn state(&self, slot: SlotId) -> ResolutionState {
        if self.pending.contains_key(&slot) {
            ResolutionState::AwaitingChoice
        } else {
            ResolutionState::Idle
        }
    }

    pub fn pending(&self, slot: SlotId) -> Option<&PendingDecision> {
        self.pending.get(&slot)
    }

    /// Park a decision. Returns `false` and leaves the existing one intact if
    /// the slot is already awaiting a choice.
    pub fn suspend(&mut self, pending: PendingDecision) -> bool {
        let slot = pending.request.slot;
        if self.pending.contains_key(&slot) {
            return false;
        }
        self.pending.insert(slot, pending);
        true
    }

    /// Remove and return the pending decision so it can be completed.
    pub fn take(&mut self, slot: SlotId) -> Option<PendingDecision> {
        self.pending.remove(&slot)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
