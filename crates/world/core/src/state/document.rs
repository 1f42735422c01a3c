//! Runtime state documents: the per-instance delta over template defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::ids::{EffectId, Position, RuntimeId, TemplateId};

/// Mutable delta over a template.
///
/// Only fields that differ from the template are present. For collection
/// fields `Some(vec![])` is an explicit-empty override and is distinct from
/// `None`, which means "use the template default".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeStateDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<TemplateId>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub stats: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<RuntimeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipped: Option<BTreeMap<String, RuntimeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_effects: Option<Vec<EffectId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_effect_ids: Option<Vec<EffectId>>,
    /// Bumped on every persisted write.
    pub version: u64,
}

impl RuntimeStateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a patch into the document.
    ///
    /// Clears run before sets, so a patch can reset a field and set another
    /// in one go. Position is never accepted here; it has its own writer.
    pub fn apply(&mut self, patch: StatePatch) -> Result<(), PatchError> {
        if patch.touches_position() {
            return Err(PatchError::PositionWrite);
        }

        for field in &patch.clear {
            self.clear(*field);
        }

        if let Some(state) = patch.state {
            self.state = Some(state);
        }
        if let Some(contents) = patch.contents {
            self.contents = Some(contents);
        }
        self.stats.extend(patch.stats);
        self.properties.extend(patch.properties);
        if let Some(inventory) = patch.inventory {
            self.inventory = Some(inventory);
        }
        if let Some(equipped) = patch.equipped {
            self.equipped = Some(equipped);
        }
        if let Some(active) = patch.active_effects {
            self.active_effects = Some(active);
        }
        if let Some(acquired) = patch.acquired_effect_ids {
            self.acquired_effect_ids = Some(acquired);
        }

        Ok(())
    }

    fn clear(&mut self, field: StateField) {
        match field {
            StateField::State => self.state = None,
            StateField::Contents => self.contents = None,
            StateField::Stats => self.stats.clear(),
            StateField::Properties => self.properties.clear(),
            StateField::Inventory => self.inventory = None,
            StateField::Equipped => self.equipped = None,
            StateField::ActiveEffects => self.active_effects = None,
            StateField::AcquiredEffectIds => self.acquired_effect_ids = None,
            // Rejected before we get here.
            StateField::CurrentPosition => {}
        }
    }

    /// Overwrites the authoritative position.
    ///
    /// Only the occupancy-consistent writer in the runtime may call this; a
    /// bare call leaves the occupancy index stale.
    pub fn set_position(&mut self, position: Position) {
        self.current_position = Some(position);
    }

    /// Returns the inventory override, or an empty list if none is set.
    pub fn inventory_ids(&self) -> &[RuntimeId] {
        self.inventory.as_deref().unwrap_or(&[])
    }

    pub fn touch(&mut self) {
        self.version += 1;
    }
}

/// Field names of a runtime state document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateField {
    State,
    Contents,
    Stats,
    Properties,
    CurrentPosition,
    Inventory,
    Equipped,
    ActiveEffects,
    AcquiredEffectIds,
}

/// Partial update for a runtime state document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatePatch {
    pub state: Option<String>,
    pub contents: Option<Vec<TemplateId>>,
    pub stats: BTreeMap<String, i64>,
    pub properties: BTreeMap<String, Value>,
    pub current_position: Option<Position>,
    pub inventory: Option<Vec<RuntimeId>>,
    pub equipped: Option<BTreeMap<String, RuntimeId>>,
    pub active_effects: Option<Vec<EffectId>>,
    pub acquired_effect_ids: Option<Vec<EffectId>>,
    /// Overrides to drop, reverting the field to its template default.
    pub clear: Vec<StateField>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn contents<I, T>(mut self, contents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TemplateId>,
    {
        self.contents = Some(contents.into_iter().map(Into::into).collect());
        self
    }

    pub fn inventory(mut self, items: Vec<RuntimeId>) -> Self {
        self.inventory = Some(items);
        self
    }

    pub fn stat(mut self, key: impl Into<String>, value: i64) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn clearing(mut self, field: StateField) -> Self {
        self.clear.push(field);
        self
    }

    /// Whether the patch tries to write or clear the authoritative position.
    pub fn touches_position(&self) -> bool {
        self.current_position.is_some() || self.clear.contains(&StateField::CurrentPosition)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("current_position can only be written by the occupancy-consistent move path")]
    PositionWrite,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::GridPoint;

    #[test]
    fn explicit_empty_collection_survives_serialization() {
        let mut doc = RuntimeStateDocument::new();
        doc.apply(StatePatch::new().contents(Vec::<TemplateId>::new()))
            .unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let back: RuntimeStateDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.contents, Some(vec![]));

        let absent: RuntimeStateDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.contents, None);
    }

    #[test]
    fn clear_runs_before_set() {
        let mut doc = RuntimeStateDocument::new();
        doc.apply(StatePatch::new().state("open").stat("hp", 3))
            .unwrap();

        doc.apply(
            StatePatch::new()
                .clearing(StateField::Stats)
                .clearing(StateField::State)
                .stat("mp", 1),
        )
        .unwrap();

        assert_eq!(doc.state, None);
        assert_eq!(doc.stats.len(), 1);
        assert_eq!(doc.stats.get("mp"), Some(&1));
    }

    #[test]
    fn position_patches_are_refused() {
        let mut doc = RuntimeStateDocument::new();
        let mut patch = StatePatch::new();
        patch.current_position = Some(Position::new(RuntimeId::from("c"), GridPoint::ORIGIN));

        assert_eq!(doc.apply(patch), Err(PatchError::PositionWrite));
        assert_eq!(
            doc.apply(StatePatch::new().clearing(StateField::CurrentPosition)),
            Err(PatchError::PositionWrite)
        );
        assert!(doc.current_position.is_none());
    }
}
