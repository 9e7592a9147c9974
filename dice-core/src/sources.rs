//! Effect owners and the aggregator that merges them.
//!
//! Four independent owners contribute effects to a roll:
//! 1. the rolled die itself (built-in effects)
//! 2. every permanently held item with quantity > 0, in storage order
//! 3. the active persona
//! 4. one-shot consumable buffs, in the order they were granted
//!
//! That order is observable: later categories override earlier ones, so range
//! folding and value rewriting both walk effects in exactly this sequence.

use crate::context::SlotId;
use crate::dice::DieType;
use crate::effect::Effect;
use serde::{Deserialize, Serialize};

/// A die placed into active play, with the effects it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolledDie {
    pub die: DieType,
    pub effects: Vec<Effect>,
}

impl RolledDie {
    pub fn new(die: DieType) -> Self {
        Self {
            die,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// A permanently held item. Items at quantity zero contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldItem {
    pub name: String,
    pub quantity: u32,
    pub effects: Vec<Effect>,
}

impl HeldItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: 1,
            effects: Vec::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// The active player persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub effects: Vec<Effect>,
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Read access to every effect owner, plus the one mutation the pipeline
/// performs: clearing consumables once a roll has resolved them.
pub trait EffectSources {
    /// The die placed in `slot`, if any.
    fn rolled_die(&self, slot: SlotId) -> Option<&RolledDie>;

    /// All held items in storage order, including depleted ones.
    fn held_items(&self) -> &[HeldItem];

    /// Effects registered by the active persona.
    fn persona_effects(&self) -> &[Effect];

    /// Active one-shot buffs in grant order.
    fn consumable_effects(&self) -> &[Effect];

    /// Drop every active one-shot buff.
    fn clear_consumables(&mut self);
}

/// Which owner category an effect came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectOrigin {
    RolledObject,
    HeldItem,
    Persona,
    Consumable,
}

/// The four effect lists for one slot, in aggregation order.
#[derive(Debug, Clone)]
pub struct EffectStack<'a> {
    /// Die definition of the rolled object.
    pub die: DieType,
    pub object: &'a [Effect],
    /// One entry per held item with quantity > 0.
    pub items: Vec<&'a [Effect]>,
    pub persona: &'a [Effect],
    pub consumables: &'a [Effect],
}

impl<'a> EffectStack<'a> {
    /// Walk every effect: object, items, persona, consumables.
    pub fn iter(&self) -> impl Iterator<Item = (EffectOrigin, &'a Effect)> + '_ {
        let object = self.object.iter().map(|e| (EffectOrigin::RolledObject, e));
        let items = self
            .items
            .iter()
            .copied()
            .flat_map(|effects| effects.iter())
            .map(|e| (EffectOrigin::HeldItem, e));
        let persona = self.persona.iter().map(|e| (EffectOrigin::Persona, e));
        let consumables = self
            .consumables
            .iter()
            .map(|e| (EffectOrigin::Consumable, e));
        object.chain(items).chain(persona).chain(consumables)
    }

    /// Effects only, in aggregation order.
    pub fn effects(&self) -> impl Iterator<Item = &'a Effect> + '_ {
        self.iter().map(|(_, effect)| effect)
    }

    pub fn len(&self) -> usize {
        self.object.len()
            + self.items.iter().map(|e| e.len()).sum::<usize>()
            + self.persona.len()
            + self.consumables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Gather the effect lists that apply to `slot`.
///
/// Returns `None` when no die is placed in the slot; without a die
/// definition there is no native interval to work from.
pub fn aggregate<S: EffectSources + ?Sized>(sources: &S, slot: SlotId) -> Option<EffectStack<'_>> {
    let rolled = sources.rolled_die(slot)?;
    let items = sources
        .held_items()
        .iter()
        .filter(|item| item.quantity > 0)
        .map(|item| item.effects.as_slice())
        .collect();

    Some(EffectStack {
        die: rolled.die,
        object: &rolled.effects,
        items,
        persona: sources.persona_effects(),
        consumables: sources.consumable_effects(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectKind;
    use crate::table::RollTable;

    #[test]
    fn test_aggregation_order() {
        let mut table = RollTable::new();
        let slot = table.place(
            RolledDie::new(DieType::D6).with_effect(Effect::new("object", EffectKind::Additive(1))),
        );
        table.add_item(
            HeldItem::new("Charm").with_effect(Effect::new("item-a", EffectKind::Additive(2))),
        );
        table.add_item(
            HeldItem::new("Idol").with_effect(Effect::new("item-b", EffectKind::Additive(3))),
        );
        table.set_persona(
            Persona::new("Gambler").with_effect(Effect::new("persona", EffectKind::Multiplier(2))),
        );
        table.grant_buff(Effect::new("buff-1", EffectKind::Additive(4)));
        table.grant_buff(Effect::new("buff-2", EffectKind::Additive(5)));

        let stack = aggregate(&table, slot).unwrap();
        let names: Vec<&str> = stack.effects().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["object", "item-a", "item-b", "persona", "buff-1", "buff-2"]
        );
        let origins: Vec<EffectOrigin> = stack.iter().map(|(o, _)| o).collect();
        assert_eq!(origins[0], EffectOrigin::RolledObject);
        assert_eq!(origins[2], EffectOrigin::HeldItem);
        assert_eq!(origins[3], EffectOrigin::Persona);
        assert_eq!(origins[5], EffectOrigin::Consumable);
        assert_eq!(stack.len(), 6);
    }

    #[test]
    fn test_depleted_items_are_skipped() {
        let mut table = RollTable::new();
        let slot = table.place(RolledDie::new(DieType::D8));
        table.add_item(
            HeldItem::new("Spent")
                .with_quantity(0)
                .with_effect(Effect::new("spent", EffectKind::Additive(9))),
        );
        let stack = aggregate(&table, slot).unwrap();
        assert!(stack.is_empty());
        assert_eq!(stack.die, DieType::D8);
    }

    #[test]
    fn test_unknown_slot() {
        let table = RollTable::new();
        assert!(aggregate(&table, SlotId::new()).is_none());
    }
}
