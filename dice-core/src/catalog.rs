//! Standard effect catalogue.
//!
//! Named, ready-made effects that dice, items, personas and consumables can
//! reference. Every lookup returns a fresh instance with its own id.

use crate::dice::Parity;
use crate::effect::{Alignment, Effect, EffectKind};

/// Catalogue entries: name, description, kind.
const STANDARD_EFFECTS: &[(&str, &str, EffectKind)] = &[
    ("Weighted", "Faces below 3 are never legal.", EffectKind::MinValue(3)),
    ("Chipped", "Faces above 4 are never legal.", EffectKind::MaxValue(4)),
    (
        "Steady Hand",
        "Rolls land between 2 and 5 and are held there.",
        EffectKind::Clamp { min: 2, max: 5 },
    ),
    ("Even Keel", "Only even faces are legal.", EffectKind::Parity(Parity::Even)),
    ("Odd Luck", "Only odd faces are legal.", EffectKind::Parity(Parity::Odd)),
    ("Lead Core", "Only the lower half of the die can come up.", EffectKind::LowerHalf),
    ("Feather Core", "Only the upper half of the die can come up.", EffectKind::UpperHalf),
    ("Lucky Coin", "Adds 1 to every roll.", EffectKind::Additive(1)),
    ("Rusty Nail", "Subtracts 1 from every roll.", EffectKind::Additive(-1)),
    ("Twin Stars", "Doubles every roll.", EffectKind::Multiplier(2)),
    ("Loaded Six", "The roll always counts as 6.", EffectKind::Fixed(6)),
    (
        "Third Wind",
        "Adds 2 on every third turn.",
        EffectKind::TurnBonus { every: 3, bonus: 2 },
    ),
    ("Momentum", "Never rolls lower than the previous roll.", EffectKind::Momentum),
    ("Destiny", "Choose between your roll and a fresh one.", EffectKind::Destiny),
    ("Nudge", "Push your roll one step up or down.", EffectKind::Nudge),
];

/// Build a catalogue effect by name (case-insensitive).
pub fn find_effect(name: &str) -> Option<Effect> {
    let name_lower = name.to_lowercase();
    STANDARD_EFFECTS
        .iter()
        .find(|(entry, _, _)| entry.to_lowercase() == name_lower)
        .map(|(entry, description, kind)| {
            Effect::new(*entry, kind.clone()).with_description(*description)
        })
}

/// Build every catalogue effect, in catalogue order.
pub fn standard_effects() -> Vec<Effect> {
    STANDARD_EFFECTS
        .iter()
        .map(|(name, description, kind)| {
            Effect::new(*name, kind.clone()).with_description(*description)
        })
        .collect()
}

/// Catalogue names, in catalogue order.
pub fn effect_names() -> impl Iterator<Item = &'static str> {
    STANDARD_EFFECTS.iter().map(|(name, _, _)| *name)
}

/// Catalogue effects with the given alignment.
pub fn effects_with_alignment(alignment: Alignment) -> Vec<Effect> {
    standard_effects()
        .into_iter()
        .filter(|effect| effect.alignment == alignment)
        .collect()
}
