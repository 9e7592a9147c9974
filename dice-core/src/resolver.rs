//! Synchronous value resolution.
//!
//! Preview and final resolution both go through [`resolve_value`], so the
//! value a die is steered toward is the value the player will receive.

use crate::context::RollContext;
use crate::effect::Effect;
use crate::sources::EffectStack;
use tracing::debug;

/// Apply every synchronous value modifier, in aggregation order.
///
/// Effects that need a player decision are skipped here; see
/// [`first_decision`].
pub fn resolve_value(stack: &EffectStack<'_>, raw: i32, ctx: &RollContext) -> i32 {
    stack
        .iter()
        .filter(|(_, effect)| effect.rewrites_value() && !effect.requires_decision())
        .fold(raw, |value, (origin, effect)| {
            let next = effect.kind.apply(value, ctx);
            debug!(?origin, effect = %effect.name, from = value, to = next, "Value modifier applied");
            next
        })
}

/// The first effect, in aggregation order, that suspends for a decision.
///
/// Only this one is honored per roll; later decision effects stay dormant.
pub fn first_decision<'a>(stack: &EffectStack<'a>) -> Option<&'a Effect> {
    stack.effects().find(|effect| effect.requires_decision())
}
