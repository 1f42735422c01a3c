//! Baseline interactions synthesized for templates that declare no rules.
//!
//! Two fixed tables keep every template actionable without authoring:
//! - archetypes keyed by `interaction_type` (`openable → {open, close}`)
//! - plain state-transition pairs (`closed → open`, `unlit → lit`, ...)

use crate::template::{InteractionRule, TemplateDefinition};

/// One verb of an archetype, optionally moving the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchetypeVerb {
    pub action: &'static str,
    pub from: Option<&'static str>,
    pub to: Option<&'static str>,
}

const fn verb(action: &'static str, from: &'static str, to: &'static str) -> ArchetypeVerb {
    ArchetypeVerb {
        action,
        from: Some(from),
        to: Some(to),
    }
}

const fn stateless(action: &'static str) -> ArchetypeVerb {
    ArchetypeVerb {
        action,
        from: None,
        to: None,
    }
}

const OPENABLE: &[ArchetypeVerb] = &[verb("open", "closed", "open"), verb("close", "open", "closed")];
const LOCKABLE: &[ArchetypeVerb] = &[
    verb("unlock", "locked", "closed"),
    verb("lock", "closed", "locked"),
];
const LIGHTABLE: &[ArchetypeVerb] = &[
    verb("light", "unlit", "lit"),
    verb("extinguish", "lit", "unlit"),
];
const SWITCHABLE: &[ArchetypeVerb] = &[
    verb("switch_on", "off", "on"),
    verb("switch_off", "on", "off"),
];
const BREAKABLE: &[ArchetypeVerb] = &[verb("break", "intact", "broken")];
const READABLE: &[ArchetypeVerb] = &[stateless("read")];
const USABLE: &[ArchetypeVerb] = &[stateless("use")];
const TALKABLE: &[ArchetypeVerb] = &[stateless("talk")];

/// Looks up the verbs of an interaction archetype.
pub fn archetype_verbs(interaction_type: &str) -> Option<&'static [ArchetypeVerb]> {
    let verbs = match interaction_type {
        "openable" | "container" => OPENABLE,
        "lockable" => LOCKABLE,
        "lightable" => LIGHTABLE,
        "switchable" => SWITCHABLE,
        "breakable" => BREAKABLE,
        "readable" => READABLE,
        "usable" => USABLE,
        "talkable" => TALKABLE,
        _ => return None,
    };
    Some(verbs)
}

/// State pairs that imply a verb even without an archetype.
pub const TRANSITION_PAIRS: &[ArchetypeVerb] = &[
    verb("open", "closed", "open"),
    verb("close", "open", "closed"),
    verb("unlock", "locked", "closed"),
    verb("lock", "closed", "locked"),
    verb("light", "unlit", "lit"),
    verb("extinguish", "lit", "unlit"),
    verb("switch_on", "off", "on"),
    verb("switch_off", "on", "off"),
    verb("break", "intact", "broken"),
];

/// Where a candidate interaction came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleOrigin {
    Declared,
    Archetype,
    TransitionPair,
}

/// Every interaction a template offers, before state filtering.
///
/// Declared rules win outright. Otherwise the archetype table applies, and
/// failing that the transition-pair table.
pub fn candidate_rules(template: &TemplateDefinition) -> Vec<(InteractionRule, RuleOrigin)> {
    if !template.interaction_rules.is_empty() {
        return template
            .interaction_rules
            .iter()
            .cloned()
            .map(|rule| (rule, RuleOrigin::Declared))
            .collect();
    }

    if let Some(verbs) = template.interaction_type.as_deref().and_then(archetype_verbs) {
        return verbs
            .iter()
            .filter_map(|v| synthesize(template, v))
            .map(|rule| (rule, RuleOrigin::Archetype))
            .collect();
    }

    if template.possible_states.is_empty() {
        return Vec::new();
    }

    TRANSITION_PAIRS
        .iter()
        .filter_map(|v| synthesize(template, v))
        .map(|rule| (rule, RuleOrigin::TransitionPair))
        .collect()
}

fn synthesize(template: &TemplateDefinition, verb: &ArchetypeVerb) -> Option<InteractionRule> {
    let mut rule = InteractionRule::new(verb.action);

    // Without a declared state space the verb is always on offer.
    if template.possible_states.is_empty() {
        rule.target_state = verb.to.map(str::to_owned);
        return Some(rule);
    }

    match verb.to {
        Some(to) if template.state_index(to).is_none() => return None,
        Some(to) => rule.target_state = Some(to.to_owned()),
        None => {}
    }

    if let Some(from) = verb.from.filter(|f| template.state_index(f).is_some()) {
        rule.required_state = Some(from.to_owned());
    }

    Some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::InstanceKind;

    fn actions(rules: &[(InteractionRule, RuleOrigin)]) -> Vec<&str> {
        rules.iter().map(|(r, _)| r.action.as_str()).collect()
    }

    #[test]
    fn openable_without_states_offers_open_and_close() {
        let door =
            TemplateDefinition::new("door", InstanceKind::Object).with_interaction_type("openable");
        let rules = candidate_rules(&door);
        assert_eq!(actions(&rules), vec!["open", "close"]);
        assert!(rules.iter().all(|(_, o)| *o == RuleOrigin::Archetype));
    }

    #[test]
    fn declared_rules_suppress_synthesis() {
        let torch = TemplateDefinition::new("torch", InstanceKind::Object)
            .with_interaction_type("lightable")
            .with_states(["unlit", "lit"])
            .with_rule(InteractionRule::new("light").targeting("lit"));
        assert_eq!(actions(&candidate_rules(&torch)), vec!["light"]);
    }

    #[test]
    fn transition_pairs_follow_the_state_space() {
        let torch =
            TemplateDefinition::new("torch", InstanceKind::Object).with_states(["unlit", "lit"]);
        let rules = candidate_rules(&torch);
        assert_eq!(actions(&rules), vec!["light", "extinguish"]);
        assert_eq!(rules[0].0.required_state.as_deref(), Some("unlit"));
        assert_eq!(rules[0].0.target_state.as_deref(), Some("lit"));
    }

    #[test]
    fn archetype_verbs_outside_the_state_space_are_dropped() {
        let hatch = TemplateDefinition::new("hatch", InstanceKind::Object)
            .with_interaction_type("lockable")
            .with_states(["locked", "unlocked"]);
        // Both lockable verbs target or leave "closed", which hatch lacks.
        let rules = candidate_rules(&hatch);
        assert_eq!(actions(&rules), vec!["lock"]);
        assert_eq!(rules[0].0.required_state, None);
    }

    #[test]
    fn unknown_archetype_without_states_offers_nothing() {
        let rock =
            TemplateDefinition::new("rock", InstanceKind::Object).with_interaction_type("throwable");
        assert!(candidate_rules(&rock).is_empty());
    }
}
