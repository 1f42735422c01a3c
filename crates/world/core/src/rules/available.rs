//! Derive the actions an actor can take from the merged state of its cell.
//!
//! [`resolve_actions`] is pure: callers gather a [`CellView`] (exits already
//! mapped to runtime ids, objects and entities already merged) and get back
//! an ordered list of descriptors. Nothing is read or written here.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::ids::{RuntimeId, TemplateId};
use crate::rules::archetype::{RuleOrigin, candidate_rules};
use crate::rules::transition::{RuleRejection, evaluate_rule};
use crate::state::EffectiveState;
use crate::template::{InteractionRule, TemplateDefinition};

/// Verb used for the automatic take-everything action on containers.
pub const PICKUP_ACTION: &str = "pickup";

/// Verb used for moving through an exit.
pub const MOVE_ACTION: &str = "move";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Move,
    Interact,
    Pickup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Cell,
    Object,
    Entity,
}

/// Where a descriptor came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    Exit,
    Declared,
    Archetype,
    TransitionPair,
    Automatic,
}

impl From<RuleOrigin> for ActionSource {
    fn from(origin: RuleOrigin) -> Self {
        match origin {
            RuleOrigin::Declared => Self::Declared,
            RuleOrigin::Archetype => Self::Archetype,
            RuleOrigin::TransitionPair => Self::TransitionPair,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionTarget {
    pub runtime_id: RuntimeId,
    pub template_id: TemplateId,
    pub kind: TargetKind,
}

/// One action the actor may currently perform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub action: String,
    pub label: String,
    pub kind: ActionKind,
    pub target: ActionTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_state: Option<String>,
    pub source: ActionSource,
}

impl ActionDescriptor {
    /// Whether this descriptor names the same action on the same target.
    pub fn matches(&self, action: &str, target: &RuntimeId) -> bool {
        self.action == action && &self.target.runtime_id == target
    }
}

/// Exit whose target cell has already been resolved for the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedExit {
    pub direction: String,
    pub label: Option<String>,
    pub target_template: TemplateId,
    pub target_runtime_id: RuntimeId,
}

/// An object or entity present in the cell, with its merged state.
#[derive(Clone, Copy, Debug)]
pub struct Interactable<'a> {
    pub template: &'a TemplateDefinition,
    pub state: &'a EffectiveState,
}

impl Interactable<'_> {
    pub fn runtime_id(&self) -> &RuntimeId {
        &self.state.runtime_id
    }

    fn target(&self, kind: TargetKind) -> ActionTarget {
        ActionTarget {
            runtime_id: self.state.runtime_id.clone(),
            template_id: self.template.id.clone(),
            kind,
        }
    }
}

/// Everything the resolver needs to know about one cell.
#[derive(Clone, Debug, Default)]
pub struct CellView<'a> {
    pub exits: Vec<ResolvedExit>,
    pub objects: Vec<Interactable<'a>>,
    pub entities: Vec<Interactable<'a>>,
}

/// Computes the ordered list of actions available to `actor` in a cell.
///
/// Order: moves (exit order), then objects (view order; rule actions before
/// the automatic pickup), then other entities.
pub fn resolve_actions(actor: &RuntimeId, view: &CellView<'_>) -> Vec<ActionDescriptor> {
    let mut actions = Vec::new();

    actions.extend(view.exits.iter().map(move_descriptor));

    for object in &view.objects {
        actions.extend(interactions(object, TargetKind::Object));
        if let Some(pickup) = automatic_pickup(object) {
            actions.push(pickup);
        }
    }

    for entity in view.entities.iter().filter(|e| e.runtime_id() != actor) {
        actions.extend(interactions(entity, TargetKind::Entity));
    }

    actions
}

/// Explains why `action` on `target` is not currently available.
///
/// Returns the first rejection among the candidate rules carrying that verb,
/// or [`RuleRejection::UnknownAction`] if nothing on the target offers it.
pub fn explain_rejection(action: &str, target: &Interactable<'_>) -> RuleRejection {
    candidate_rules(target.template)
        .into_iter()
        .filter(|(rule, _)| rule.action == action)
        .find_map(|(rule, _)| evaluate_rule(&rule, target.template, &target.state.state).err())
        .unwrap_or_else(|| RuleRejection::UnknownAction {
            action: action.to_owned(),
        })
}

fn move_descriptor(exit: &ResolvedExit) -> ActionDescriptor {
    ActionDescriptor {
        action: MOVE_ACTION.to_owned(),
        label: exit
            .label
            .clone()
            .unwrap_or_else(|| format!("go {}", exit.direction)),
        kind: ActionKind::Move,
        target: ActionTarget {
            runtime_id: exit.target_runtime_id.clone(),
            template_id: exit.target_template.clone(),
            kind: TargetKind::Cell,
        },
        direction: Some(exit.direction.clone()),
        target_state: None,
        source: ActionSource::Exit,
    }
}

fn interactions(target: &Interactable<'_>, kind: TargetKind) -> Vec<ActionDescriptor> {
    let current = target.state.state.as_str();

    candidate_rules(target.template)
        .into_iter()
        .filter(|(rule, _)| evaluate_rule(rule, target.template, current).is_ok())
        .map(|(rule, origin)| rule_descriptor(&rule, origin, target.target(kind)))
        .collect()
}

fn rule_descriptor(
    rule: &InteractionRule,
    origin: RuleOrigin,
    target: ActionTarget,
) -> ActionDescriptor {
    // Only objects hold takeable contents; entities treat the verb as an interaction.
    let kind = if rule.action == PICKUP_ACTION && target.kind == TargetKind::Object {
        ActionKind::Pickup
    } else {
        ActionKind::Interact
    };

    ActionDescriptor {
        action: rule.action.clone(),
        label: rule.display_label().to_owned(),
        kind,
        target,
        direction: None,
        target_state: rule.target_state.clone(),
        source: origin.into(),
    }
}

fn automatic_pickup(object: &Interactable<'_>) -> Option<ActionDescriptor> {
    if object.state.contents.is_empty() {
        return None;
    }

    let declared = object
        .template
        .interaction_rules
        .iter()
        .any(|rule| rule.action == PICKUP_ACTION);
    if declared {
        return None;
    }

    Some(ActionDescriptor {
        action: PICKUP_ACTION.to_owned(),
        label: format!("take from {}", object.template.display_name()),
        kind: ActionKind::Pickup,
        target: object.target(TargetKind::Object),
        direction: None,
        target_state: None,
        source: ActionSource::Automatic,
    })
}
