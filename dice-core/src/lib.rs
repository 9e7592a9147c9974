//! Dice-roll resolution pipeline.
//!
//! This crate turns one physically observed face into the single
//! authoritative roll result:
//! - Effects from the die, held items, the persona and one-shot buffs are
//!   merged in a fixed order
//! - Range modifiers fold into a legal face window, and illegal faces are
//!   steered toward the nearest legal one
//! - Value modifiers rewrite the roll, and decision effects suspend it until
//!   the player chooses
//! - Completed rolls are recorded per slot and reported downstream once
//!
//! # Quick Start
//!
//! ```ignore
//! use dice_core::{catalog, DieType, PipelineConfig, RollPipeline, RollTable, RolledDie};
//! use dice_core::coordinator::NoPrompt;
//! use dice_core::pipeline::ChannelListener;
//!
//! let mut table = RollTable::new();
//! let slot = table.place(RolledDie::new(DieType::D6).with_effect(catalog::find_effect("Weighted").unwrap()));
//!
//! let (listener, _completed) = ChannelListener::channel();
//! let mut pipeline = RollPipeline::new(PipelineConfig::default(), NoPrompt, listener);
//!
//! let outcome = pipeline.resolve(&mut table, slot, 4)?;
//! println!("{:?}", outcome.record());
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod dice;
pub mod effect;
pub mod pipeline;
pub mod range;
pub mod records;
pub mod resolver;
pub mod settle;
pub mod sources;
pub mod table;
pub mod testing;

// Primary public API
pub use config::{ConfigError, PipelineConfig};
pub use context::{RollContext, SlotId};
pub use coordinator::{DecisionOption, DecisionPrompt, DecisionRequest, ResolutionState};
pub use dice::{DiceError, DieType, FaceRange, Parity};
pub use effect::{Alignment, Capabilities, Effect, EffectId, EffectKind};
pub use pipeline::{RollError, RollListener, RollOutcome, RollPipeline};
pub use records::RollRecord;
pub use settle::{Correction, Landing, PhysicsDriver};
pub use sources::{EffectSources, HeldItem, Persona, RolledDie};
pub use table::RollTable;
pub use testing::TestHarness;
