//! Immutable template definitions and the read-only store contract.
//!
//! Templates are authored content. The runtime references them by id and
//! never mutates them; everything that changes during a session lives in
//! runtime state documents layered on top.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{InstanceKind, TemplateId};

/// Per-interaction declaration that gates an action on the current state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionRule {
    /// Verb exposed to the actor (`open`, `light`, `pickup`, ...).
    pub action: String,
    pub label: Option<String>,
    pub required_state: Option<String>,
    pub forbidden_states: Vec<String>,
    pub allowed_in_states: Vec<String>,
    pub forbidden_in_states: Vec<String>,
    pub target_state: Option<String>,
}

impl InteractionRule {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn requiring(mut self, state: impl Into<String>) -> Self {
        self.required_state = Some(state.into());
        self
    }

    pub fn targeting(mut self, state: impl Into<String>) -> Self {
        self.target_state = Some(state.into());
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.action)
    }
}

/// How target-state legality is decided when a rule names a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// The explicit table decides when declared; otherwise states listed in
    /// `possible_states` may only move to a neighbouring position.
    #[default]
    LinearAdjacency,
    /// Only the explicit table decides. Without a table nothing is legal.
    ExplicitGraph,
}

/// Exit from a cell to another cell template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub direction: String,
    pub target: TemplateId,
    #[serde(default)]
    pub label: Option<String>,
}

impl Exit {
    pub fn new(direction: impl Into<String>, target: impl Into<TemplateId>) -> Self {
        Self {
            direction: direction.into(),
            target: target.into(),
            label: None,
        }
    }
}

/// Immutable blueprint for a cell, entity or object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub id: TemplateId,
    pub kind: InstanceKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_state: Option<String>,
    /// Ordered state space. Order matters under linear adjacency.
    #[serde(default)]
    pub possible_states: Vec<String>,
    /// Archetype key used when no rules are declared (`openable`, ...).
    #[serde(default)]
    pub interaction_type: Option<String>,
    #[serde(default)]
    pub interaction_rules: Vec<InteractionRule>,
    #[serde(default)]
    pub transition_mode: TransitionMode,
    #[serde(default)]
    pub transitions: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub base_stats: BTreeMap<String, i64>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Cells: object templates placed in the cell. Objects: item templates
    /// held inside.
    #[serde(default)]
    pub contents: Vec<TemplateId>,
    /// Entities: item templates carried at creation.
    #[serde(default)]
    pub inventory: Vec<TemplateId>,
    #[serde(default)]
    pub exits: Vec<Exit>,
    #[serde(default)]
    pub is_player: bool,
}

impl TemplateDefinition {
    /// Creates an empty template of the given kind.
    pub fn new(id: impl Into<TemplateId>, kind: InstanceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: String::new(),
            default_state: None,
            possible_states: Vec::new(),
            interaction_type: None,
            interaction_rules: Vec::new(),
            transition_mode: TransitionMode::default(),
            transitions: None,
            base_stats: BTreeMap::new(),
            properties: BTreeMap::new(),
            contents: Vec::new(),
            inventory: Vec::new(),
            exits: Vec::new(),
            is_player: false,
        }
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.possible_states = states.into_iter().map(Into::into).collect();
        if self.default_state.is_none() {
            self.default_state = self.possible_states.first().cloned();
        }
        self
    }

    pub fn with_default_state(mut self, state: impl Into<String>) -> Self {
        self.default_state = Some(state.into());
        self
    }

    pub fn with_rule(mut self, rule: InteractionRule) -> Self {
        self.interaction_rules.push(rule);
        self
    }

    pub fn with_interaction_type(mut self, archetype: impl Into<String>) -> Self {
        self.interaction_type = Some(archetype.into());
        self
    }

    pub fn with_exit(mut self, exit: Exit) -> Self {
        self.exits.push(exit);
        self
    }

    pub fn with_contents<I, T>(mut self, contents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TemplateId>,
    {
        self.contents = contents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_inventory<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TemplateId>,
    {
        self.inventory = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stat(mut self, key: impl Into<String>, value: i64) -> Self {
        self.base_stats.insert(key.into(), value);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_transitions(mut self, table: BTreeMap<String, Vec<String>>) -> Self {
        self.transitions = Some(table);
        self
    }

    pub fn with_mode(mut self, mode: TransitionMode) -> Self {
        self.transition_mode = mode;
        self
    }

    pub fn player(mut self) -> Self {
        self.is_player = true;
        self
    }

    /// Position of `state` inside the ordered state space.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.possible_states.iter().position(|s| s == state)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Read-only access to authored templates.
///
/// Implementations hold immutable content. Dynamic state lives in the
/// runtime store, never here.
pub trait TemplateStore: Send + Sync {
    /// Looks up a template by id.
    fn template(&self, id: &TemplateId) -> Option<&TemplateDefinition>;

    /// Returns every template the store knows about.
    fn templates(&self) -> Vec<&TemplateDefinition> {
        Vec::new()
    }

    fn contains(&self, id: &TemplateId) -> bool {
        self.template(id).is_some()
    }
}
