//! Pure world model shared by the runtime and offline tools.
//!
//! `world-core` defines templates, runtime state documents and the merge
//! between them, plus the rule engine that turns merged state into legal
//! actions and combination outcomes. Nothing here touches storage; the
//! runtime crate feeds these functions and persists what they decide.
pub mod combination;
pub mod config;
pub mod effect;
pub mod ids;
pub mod rules;
pub mod state;
pub mod template;
pub use combination::{
    CombinationInput, CombinationPlan, CombinationRejection, CombinationRoll, plan_combination,
    success_probability, validate_offer,
};
pub use config::WorldConfig;
pub use effect::{CarrierType, EffectCarrierDefinition, EffectDraft, EffectValidationError};
pub use ids::{EffectId, EntityRole, GridPoint, InstanceKind, Position, RuntimeId, SessionId, TemplateId};
pub use rules::{
    ActionDescriptor, ActionKind, ActionSource, ActionTarget, CellView, Interactable, MOVE_ACTION,
    PICKUP_ACTION, ResolvedExit, RuleOrigin, RuleRejection, TargetKind, candidate_rules,
    check_transition, evaluate_rule, explain_rejection, resolve_actions,
};
pub use state::{
    EffectiveState, PatchError, RuntimeStateDocument, StateField, StatePatch, merge_state,
};
pub use template::{Exit, InteractionRule, TemplateDefinition, TemplateStore, TransitionMode};
