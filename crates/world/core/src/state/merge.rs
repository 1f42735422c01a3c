//! Effective state = template defaults ⊕ runtime overrides.
//!
//! The merge is typed per field family:
//! - scalars: override, else template default, else the configured fallback
//! - collections: override whenever present (an empty list included), else
//!   template default, else empty
//! - maps: shallow key union, override wins per key

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WorldConfig;
use crate::ids::{EffectId, InstanceKind, Position, RuntimeId, TemplateId};
use crate::state::RuntimeStateDocument;
use crate::template::TemplateDefinition;

/// Fully resolved view of an instance at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectiveState {
    pub runtime_id: RuntimeId,
    pub template_id: TemplateId,
    pub kind: InstanceKind,
    pub state: String,
    pub contents: Vec<TemplateId>,
    pub stats: BTreeMap<String, i64>,
    pub properties: BTreeMap<String, Value>,
    pub current_position: Option<Position>,
    pub inventory: Vec<RuntimeId>,
    pub equipped: BTreeMap<String, RuntimeId>,
    pub active_effects: Vec<EffectId>,
    pub acquired_effect_ids: Vec<EffectId>,
    pub version: u64,
}

impl EffectiveState {
    pub fn cell_id(&self) -> Option<&RuntimeId> {
        self.current_position.as_ref().map(|p| &p.runtime_cell_id)
    }

    pub fn holds(&self, item: &RuntimeId) -> bool {
        self.inventory.contains(item)
    }
}

fn merge_scalar(
    override_value: Option<&String>,
    template_default: Option<&String>,
    fallback: &str,
) -> String {
    override_value
        .or(template_default)
        .cloned()
        .unwrap_or_else(|| fallback.to_owned())
}

fn merge_collection<T: Clone>(override_value: Option<&Vec<T>>, template_default: &[T]) -> Vec<T> {
    match override_value {
        Some(values) => values.clone(),
        None => template_default.to_vec(),
    }
}

fn merge_map<V: Clone>(
    template_default: &BTreeMap<String, V>,
    overrides: &BTreeMap<String, V>,
) -> BTreeMap<String, V> {
    let mut merged = template_default.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Computes the effective state of an instance.
///
/// `document` is `None` for instances that have never been written.
pub fn merge_state(
    runtime_id: &RuntimeId,
    template: &TemplateDefinition,
    document: Option<&RuntimeStateDocument>,
    config: &WorldConfig,
) -> EffectiveState {
    let empty = RuntimeStateDocument::default();
    let doc = document.unwrap_or(&empty);

    EffectiveState {
        runtime_id: runtime_id.clone(),
        template_id: template.id.clone(),
        kind: template.kind,
        state: merge_scalar(
            doc.state.as_ref(),
            template.default_state.as_ref(),
            &config.fallback_state,
        ),
        contents: merge_collection(doc.contents.as_ref(), &template.contents),
        stats: merge_map(&template.base_stats, &doc.stats),
        properties: merge_map(&template.properties, &doc.properties),
        current_position: doc.current_position.clone(),
        // Template inventories name templates; runtime inventories name
        // instances, so there is no template fallback here.
        inventory: merge_collection(doc.inventory.as_ref(), &[]),
        equipped: doc.equipped.clone().unwrap_or_default(),
        active_effects: merge_collection(doc.active_effects.as_ref(), &[]),
        acquired_effect_ids: merge_collection(doc.acquired_effect_ids.as_ref(), &[]),
        version: doc.version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StatePatch;
    use serde_json::json;

    fn chest() -> TemplateDefinition {
        TemplateDefinition::new("chest", InstanceKind::Object)
            .with_states(["closed", "open"])
            .with_contents(["gold", "key"])
            .with_stat("durability", 10)
            .with_property("color", json!("brown"))
            .with_property("weight", json!(40))
    }

    fn rid() -> RuntimeId {
        RuntimeId::from("rt-chest")
    }

    #[test]
    fn template_defaults_apply_without_document() {
        let state = merge_state(&rid(), &chest(), None, &WorldConfig::default());

        assert_eq!(state.state, "closed");
        assert_eq!(state.contents, vec![TemplateId::from("gold"), TemplateId::from("key")]);
        assert_eq!(state.stats.get("durability"), Some(&10));
        assert!(state.inventory.is_empty());
    }

    #[test]
    fn scalar_falls_back_to_configured_constant() {
        let bare = TemplateDefinition::new("rock", InstanceKind::Object);
        let state = merge_state(&rid(), &bare, None, &WorldConfig::default());
        assert_eq!(state.state, WorldConfig::DEFAULT_FALLBACK_STATE);
    }

    #[test]
    fn explicit_empty_contents_override_wins() {
        let mut doc = RuntimeStateDocument::new();
        doc.apply(StatePatch::new().contents(Vec::<TemplateId>::new()))
            .unwrap();

        let state = merge_state(&rid(), &chest(), Some(&doc), &WorldConfig::default());
        assert!(state.contents.is_empty());
    }

    #[test]
    fn properties_union_with_override_per_key() {
        let mut doc = RuntimeStateDocument::new();
        doc.apply(
            StatePatch::new()
                .property("color", json!("charred"))
                .property("cursed", json!(true)),
        )
        .unwrap();

        let state = merge_state(&rid(), &chest(), Some(&doc), &WorldConfig::default());
        assert_eq!(state.properties.get("color"), Some(&json!("charred")));
        assert_eq!(state.properties.get("weight"), Some(&json!(40)));
        assert_eq!(state.properties.get("cursed"), Some(&json!(true)));
    }

    #[test]
    fn state_override_beats_template_default() {
        let mut doc = RuntimeStateDocument::new();
        doc.apply(StatePatch::new().state("open")).unwrap();
        let state = merge_state(&rid(), &chest(), Some(&doc), &WorldConfig::default());
        assert_eq!(state.state, "open");
    }
}
