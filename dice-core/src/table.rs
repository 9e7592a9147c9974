//! In-memory game table: dice in play, held items, persona, and buffs.
//!
//! `RollTable` is the default implementation of [`EffectSources`]. It can be
//! saved to and restored from a versioned JSON snapshot.

use crate::context::SlotId;
use crate::effect::{Effect, EffectId};
use crate::sources::{EffectSources, HeldItem, Persona, RolledDie};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from table persistence.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current snapshot version.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollTable {
    dice: HashMap<SlotId, RolledDie>,
    items: Vec<HeldItem>,
    persona: Option<Persona>,
    buffs: Vec<Effect>,
}

impl RollTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a die into active play and return its new slot.
    pub fn place(&mut self, die: RolledDie) -> SlotId {
        let slot = SlotId::new();
        self.dice.insert(slot, die);
        slot
    }

    /// Take a die out of active play.
    ///
    /// The pipeline's record for the slot should be cleared alongside.
    pub fn remove(&mut self, slot: SlotId) -> Option<RolledDie> {
        self.dice.remove(&slot)
    }

    pub fn die(&self, slot: SlotId) -> Option<&RolledDie> {
        self.dice.get(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.dice.keys().copied()
    }

    /// Add a permanent item at the end of storage.
    pub fn add_item(&mut self, item: HeldItem) {
        self.items.push(item);
    }

    /// Change how many of a named item are held. Returns `false` if no item
    /// has that name.
    pub fn set_item_quantity(&mut self, name: &str, quantity: u32) -> bool {
        let name_lower = name.to_lowercase();
        match self
            .items
            .iter_mut()
            .find(|item| item.name.to_lowercase() == name_lower)
        {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn items(&self) -> &[HeldItem] {
        &self.items
    }

    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = Some(persona);
    }

    pub fn clear_persona(&mut self) -> Option<Persona> {
        self.persona.take()
    }

    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    /// Grant a one-shot buff for the next completed roll.
    pub fn grant_buff(&mut self, effect: Effect) {
        self.buffs.push(effect);
    }

    /// Expire a buff before it is consumed.
    pub fn expire_buff(&mut self, id: EffectId) -> bool {
        let before = self.buffs.len();
        self.buffs.retain(|buff| buff.id != id);
        self.buffs.len() != before
    }

    pub fn buffs(&self) -> &[Effect] {
        &self.buffs
    }

    /// Serialize the table as a versioned JSON snapshot.
    pub fn to_json(&self) -> Result<String, TableError> {
        let snapshot = TableSnapshot {
            version: SNAPSHOT_VERSION,
            table: self.clone(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Restore a table from a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let snapshot: TableSnapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(TableError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        Ok(snapshot.table)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        fs::write(path, self.to_json()?).await?;
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let json = fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}

impl EffectSources for RollTable {
    fn rolled_die(&self, slot: SlotId) -> Option<&RolledDie> {
        self.dice.get(&slot)
    }

    fn held_items(&self) -> &[HeldItem] {
        &self.items
    }

    fn persona_effects(&self) -> &[Effect] {
        self.persona
            .as_ref()
            .map(|persona| persona.effects.as_slice())
            .unwrap_or(&[])
    }

    fn consumable_effects(&self) -> &[Effect] {
        &self.buffs
    }

    fn clear_consumables(&mut self) {
        self.buffs.clear();
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableSnapshot {
    version: u32,
    table: RollTable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DieType;
    use crate::effect::EffectKind;

    fn sample_table() -> (RollTable, SlotId) {
        let mut table = RollTable::new();
        let slot = table.place(
            RolledDie::new(DieType::D6).with_effect(Effect::new("Weighted", EffectKind::MinValue(2))),
        );
        table.add_item(
            HeldItem::new("Lucky Coin").with_effect(Effect::new("Lucky", EffectKind::Additive(1))),
        );
        table.set_persona(Persona::new("Oracle").with_effect(Effect::new("Fate", EffectKind::Destiny)));
        table.grant_buff(Effect::new("Surge", EffectKind::Multiplier(2)));
        (table, slot)
    }

    #[test]
    fn test_sources_view() {
        let (mut table, slot) = sample_table();
        assert_eq!(table.rolled_die(slot).unwrap().die, DieType::D6);
        assert_eq!(table.held_items().len(), 1);
        assert_eq!(table.persona_effects()[0].name, "Fate");
        assert_eq!(table.consumable_effects().len(), 1);

        table.clear_consumables();
        assert!(table.consumable_effects().is_empty());
        table.clear_persona();
        assert!(table.persona_effects().is_empty());
    }

    #[test]
    fn test_item_quantity() {
        let (mut table, _) = sample_table();
        assert!(table.set_item_quantity("lucky coin", 0));
        assert_eq!(table.items()[0].quantity, 0);
        assert!(!table.set_item_quantity("Missing", 3));
    }

    #[test]
    fn test_expire_buff() {
        let (mut table, _) = sample_table();
        let id = table.buffs()[0].id;
        assert!(table.expire_buff(id));
        assert!(!table.expire_buff(id));
        assert!(table.buffs().is_empty());
    }

    #[test]
    fn test_remove_die() {
        let (mut table, slot) = sample_table();
        assert!(table.remove(slot).is_some());
        assert!(table.rolled_die(slot).is_none());
        assert_eq!(table.slots().count(), 0);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let (table, _) = sample_table();
        let json = table.to_json().unwrap();
        assert_eq!(RollTable::from_json(&json).unwrap(), table);
    }

    #[test]
    fn test_snapshot_version_mismatch() {
        let (table, _) = sample_table();
        let json = table.to_json().unwrap().replacen("\"version\": 1", "\"version\": 7", 1);
        assert!(matches!(
            RollTable::from_json(&json),
            Err(TableError::VersionMismatch {
                expected: 1,
                found: 7
            })
        ));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let (table, slot) = sample_table();
        table.save(&path).await.unwrap();
        let loaded = RollTable::load(&path).await.unwrap();
        assert_eq!(loaded.die(slot), table.die(slot));
    }
}
