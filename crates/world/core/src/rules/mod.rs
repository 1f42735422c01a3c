//! Interaction rules, transition legality and action resolution.

pub mod archetype;
mod available;
mod transition;

pub use archetype::{RuleOrigin, candidate_rules};
pub use available::{
    ActionDescriptor, ActionKind, ActionSource, ActionTarget, CellView, Interactable, MOVE_ACTION,
    PICKUP_ACTION, ResolvedExit, TargetKind, explain_rejection, resolve_actions,
};
pub use transition::{RuleRejection, check_transition, evaluate_rule};
