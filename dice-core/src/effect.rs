//! Roll modifiers.
//!
//! Every modifier is an [`Effect`]: a named record wrapping one [`EffectKind`].
//! The kind set is closed, so the pipeline matches on it exhaustively instead
//! of probing for capabilities at runtime. A kind may carry more than one
//! capability (a clamp narrows the legal range *and* clamps the value with the
//! same bounds).
//!
//! Effects are owned by exactly one list at a time (a die's built-ins, an
//! item, the persona, or the consumable buffs). The pipeline only reads them.

use crate::context::RollContext;
use crate::coordinator::DecisionOption;
use crate::dice::{FaceRange, Parity};
use bitflags::bitflags;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId(pub Uuid);

impl EffectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an effect helps or hinders the roller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    Beneficial,
    Harmful,
}

bitflags! {
    /// What an effect is able to do during resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Narrows the legal face window.
        const RANGE = 1;
        /// Rewrites the rolled value synchronously.
        const VALUE = 1 << 1;
        /// Suspends resolution for a player decision.
        const ASYNC = 1 << 2;
    }
}

/// The closed set of modifier variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Legal faces start at `n`.
    MinValue(i32),
    /// Legal faces end at `n`.
    MaxValue(i32),
    /// Narrows the window to `[min, max]` and clamps the value into it.
    Clamp { min: i32, max: i32 },
    /// Only faces of the given parity are legal.
    Parity(Parity),
    /// Only the lower half of the die's native faces are legal.
    LowerHalf,
    /// Only the upper half of the die's native faces are legal.
    UpperHalf,
    /// Adds a flat amount.
    Additive(i32),
    /// Multiplies the value.
    Multiplier(i32),
    /// Replaces the value outright.
    Fixed(i32),
    /// Adds `bonus` on turns divisible by `every`.
    TurnBonus { every: u32, bonus: i32 },
    /// Never rolls lower than the previous completed roll.
    Momentum,
    /// Offers the player a choice between the current roll and a fresh one.
    Destiny,
    /// Offers the player a one-step adjustment in either direction.
    Nudge,
}

impl EffectKind {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            EffectKind::MinValue(_)
            | EffectKind::MaxValue(_)
            | EffectKind::Parity(_)
            | EffectKind::LowerHalf
            | EffectKind::UpperHalf => Capabilities::RANGE,
            EffectKind::Clamp { .. } => Capabilities::RANGE | Capabilities::VALUE,
            EffectKind::Additive(_)
            | EffectKind::Multiplier(_)
            | EffectKind::Fixed(_)
            | EffectKind::TurnBonus { .. }
            | EffectKind::Momentum => Capabilities::VALUE,
            EffectKind::Destiny | EffectKind::Nudge => Capabilities::ASYNC,
        }
    }

    /// Alignment used when an effect is built without an explicit one.
    pub fn default_alignment(&self) -> Alignment {
        match self {
            EffectKind::MaxValue(_) | EffectKind::LowerHalf => Alignment::Harmful,
            EffectKind::Additive(n) if *n < 0 => Alignment::Harmful,
            EffectKind::Multiplier(n) if *n < 1 => Alignment::Harmful,
            EffectKind::TurnBonus { bonus, .. } if *bonus < 0 => Alignment::Harmful,
            _ => Alignment::Beneficial,
        }
    }

    /// Fold this effect into the current legal window.
    ///
    /// The result is never wider than `range`. Halving variants derive their
    /// bound from `native` rather than from `range`, then intersect.
    pub fn narrow(&self, range: FaceRange, native: FaceRange) -> FaceRange {
        match *self {
            EffectKind::MinValue(n) => range.intersect(FaceRange::new(n, range.max)),
            EffectKind::MaxValue(n) => range.intersect(FaceRange::new(range.min, n)),
            EffectKind::Clamp { min, max } => range.intersect(FaceRange::new(min, max)),
            EffectKind::Parity(parity) => {
                range.intersect(FaceRange::with_parity(range.min, range.max, parity))
            }
            EffectKind::LowerHalf => range.intersect(FaceRange::new(native.min, native.max / 2)),
            EffectKind::UpperHalf => {
                range.intersect(FaceRange::new(native.max / 2 + 1, native.max))
            }
            EffectKind::Additive(_)
            | EffectKind::Multiplier(_)
            | EffectKind::Fixed(_)
            | EffectKind::TurnBonus { .. }
            | EffectKind::Momentum
            | EffectKind::Destiny
            | EffectKind::Nudge => range,
        }
    }

    /// Rewrite a value synchronously. Kinds without the value capability
    /// return it untouched.
    pub fn apply(&self, value: i32, ctx: &RollContext) -> i32 {
        match *self {
            // Written out rather than `clamp` so inverted bounds cannot panic.
            EffectKind::Clamp { min, max } => value.max(min).min(max),
            EffectKind::Additive(n) => value.saturating_add(n),
            EffectKind::Multiplier(n) => value.saturating_mul(n),
            EffectKind::Fixed(n) => n,
            EffectKind::TurnBonus { every, bonus } => {
                if every > 0 && ctx.turn % every == 0 {
                    value.saturating_add(bonus)
                } else {
                    value
                }
            }
            EffectKind::Momentum => ctx.previous_final.map_or(value, |prev| value.max(prev)),
            EffectKind::MinValue(_)
            | EffectKind::MaxValue(_)
            | EffectKind::Parity(_)
            | EffectKind::LowerHalf
            | EffectKind::UpperHalf
            | EffectKind::Destiny
            | EffectKind::Nudge => value,
        }
    }

    /// Build the labeled options an async kind presents to the player.
    ///
    /// Every list includes an option that keeps `value`. Alternates come from `range`
    /// when it has any legal face, otherwise from `native`. Returns an empty
    /// list for kinds without the async capability.
    pub fn decision_options<R: Rng>(
        &self,
        value: i32,
        range: FaceRange,
        native: FaceRange,
        rng: &mut R,
        resample_attempts: u32,
    ) -> Vec<DecisionOption> {
        let pool = if range.is_empty() { native } else { range };
        match self {
            EffectKind::Destiny => {
                let alternate = draw_alternate(value, pool, rng, resample_attempts);
                vec![
                    DecisionOption::new(format!("Keep: {value}"), value),
                    DecisionOption::new(format!("Alternate: {alternate}"), alternate),
                ]
            }
            EffectKind::Nudge => {
                let mut options = Vec::with_capacity(3);
                let lower = value.saturating_sub(1);
                if pool.contains(lower) {
                    options.push(DecisionOption::new(format!("Lower: {lower}"), lower));
                }
                options.push(DecisionOption::new(format!("Keep: {value}"), value));
                let higher = value.saturating_add(1);
                if pool.contains(higher) {
                    options.push(DecisionOption::new(format!("Raise: {higher}"), higher));
                }
                options
            }
            _ => Vec::new(),
        }
    }
}

/// Pick a face from `pool` that differs from `value`.
///
/// Samples up to `attempts` times, then falls back to the lowest other face so
/// the alternate differs whenever the pool has more than one face.
fn draw_alternate<R: Rng>(value: i32, pool: FaceRange, rng: &mut R, attempts: u32) -> i32 {
    let faces = pool.len();
    if faces <= 1 {
        return pool.min;
    }
    for _ in 0..attempts {
        if let Some(face) = pool.nth_face(rng.gen_range(0..faces)) {
            if face != value {
                return face;
            }
        }
    }
    // At most two steps: the pool holds at least two faces.
    pool.faces().find(|face| *face != value).unwrap_or(pool.min)
}

/// A named modifier contributed by one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub name: String,
    pub description: String,
    pub alignment: Alignment,
    pub kind: EffectKind,
}

impl Effect {
    /// Create an effect with the kind's default alignment.
    pub fn new(name: impl Into<String>, kind: EffectKind) -> Self {
        Self {
            id: EffectId::new(),
            name: name.into(),
            description: String::new(),
            alignment: kind.default_alignment(),
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    pub fn narrows_range(&self) -> bool {
        self.capabilities().contains(Capabilities::RANGE)
    }

    pub fn rewrites_value(&self) -> bool {
        self.capabilities().contains(Capabilities::VALUE)
    }

    pub fn requires_decision(&self) -> bool {
        self.capabilities().contains(Capabilities::ASYNC)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
