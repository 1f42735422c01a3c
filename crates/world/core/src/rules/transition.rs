//! Rule evaluation and state-transition legality.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{InteractionRule, TemplateDefinition, TransitionMode};

/// Why a rule does not currently pass.
///
/// These are ordinary gameplay outcomes, not failures of the system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RuleRejection {
    #[error("requires state '{required}', currently '{current}'")]
    RequiredState { required: String, current: String },

    #[error("not possible while '{current}'")]
    ForbiddenState { current: String },

    #[error("only possible while in one of {allowed:?}, currently '{current}'")]
    NotAllowedInState {
        current: String,
        allowed: Vec<String>,
    },

    #[error("not possible while in '{current}'")]
    ForbiddenInState { current: String },

    #[error("already '{state}'")]
    NoOpTransition { state: String },

    #[error("cannot go from '{from}' to '{to}'")]
    IllegalTransition { from: String, to: String },

    #[error("'{action}' is not something you can do here")]
    UnknownAction { action: String },
}

/// Decides whether `current → target` is a legal transition for a template.
///
/// An explicit table always decides when declared. Without one, linear
/// adjacency applies to states listed in `possible_states`; states outside the
/// declared space are unconstrained. Under [`TransitionMode::ExplicitGraph`]
/// a missing table makes every transition illegal.
pub fn check_transition(
    template: &TemplateDefinition,
    current: &str,
    target: &str,
) -> Result<(), RuleRejection> {
    if current == target {
        return Err(RuleRejection::NoOpTransition {
            state: current.to_owned(),
        });
    }

    let legal = match (&template.transitions, template.transition_mode) {
        (Some(table), _) => table
            .get(current)
            .is_some_and(|targets| targets.iter().any(|t| t == target)),
        (None, TransitionMode::ExplicitGraph) => false,
        (None, TransitionMode::LinearAdjacency) => {
            match (template.state_index(current), template.state_index(target)) {
                (Some(from), Some(to)) => from.abs_diff(to) <= 1,
                _ => true,
            }
        }
    };

    if legal {
        Ok(())
    } else {
        Err(RuleRejection::IllegalTransition {
            from: current.to_owned(),
            to: target.to_owned(),
        })
    }
}

/// Evaluates one rule against the current state.
///
/// Checks run in declaration order of the rule's fields and stop at the
/// first failure.
pub fn evaluate_rule(
    rule: &InteractionRule,
    template: &TemplateDefinition,
    current: &str,
) -> Result<(), RuleRejection> {
    if let Some(required) = rule.required_state.as_ref().filter(|r| r.as_str() != current) {
        return Err(RuleRejection::RequiredState {
            required: required.clone(),
            current: current.to_owned(),
        });
    }

    if rule.forbidden_states.iter().any(|s| s == current) {
        return Err(RuleRejection::ForbiddenState {
            current: current.to_owned(),
        });
    }

    if !rule.allowed_in_states.is_empty() && !rule.allowed_in_states.iter().any(|s| s == current) {
        return Err(RuleRejection::NotAllowedInState {
            current: current.to_owned(),
            allowed: rule.allowed_in_states.clone(),
        });
    }

    if rule.forbidden_in_states.iter().any(|s| s == current) {
        return Err(RuleRejection::ForbiddenInState {
            current: current.to_owned(),
        });
    }

    if let Some(target) = &rule.target_state {
        check_transition(template, current, target)?;
    }

    Ok(())
}
