//! Probabilistic item combination.
//!
//! The maths and the choice of what gets consumed live here; the runtime
//! only feeds in held items with their carriers and applies the plan.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::WorldConfig;
use crate::ids::{EffectId, RuntimeId};

/// Success chance for `item_count` inputs of which `carrier_count` carry at
/// least one effect.
///
/// `clamp(0.5 - 0.08 * items, 0.1, 0.9) + 0.03 * carriers`
pub fn success_probability(item_count: usize, carrier_count: usize) -> f64 {
    let base = WorldConfig::BASE_COMBINATION_CHANCE
        - WorldConfig::PER_ITEM_PENALTY * item_count as f64;
    base.clamp(
        WorldConfig::MIN_COMBINATION_CHANCE,
        WorldConfig::MAX_COMBINATION_CHANCE,
    ) + WorldConfig::PER_CARRIER_BONUS * carrier_count as f64
}

/// One held item offered for combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinationInput {
    pub item: RuntimeId,
    pub carriers: Vec<EffectId>,
}

impl CombinationInput {
    pub fn new(item: RuntimeId, carriers: Vec<EffectId>) -> Self {
        Self { item, carriers }
    }

    pub fn is_carrier(&self) -> bool {
        !self.carriers.is_empty()
    }
}

/// What the runtime must do once the roll is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CombinationPlan {
    /// Consume every input and mint one item carrying `carriers`.
    Success {
        consumed: Vec<RuntimeId>,
        carriers: Vec<EffectId>,
    },
    /// Consume `consumed` and nothing else.
    Failure { consumed: Vec<RuntimeId> },
}

impl CombinationPlan {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn consumed(&self) -> &[RuntimeId] {
        match self {
            Self::Success { consumed, .. } | Self::Failure { consumed } => consumed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinationRoll {
    pub probability: f64,
    pub roll: f64,
    pub plan: CombinationPlan,
}

/// Why a set of items cannot be offered for combination at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CombinationRejection {
    #[error("at least {min} items are needed, got {count}")]
    TooFewItems { count: usize, min: usize },

    #[error("at most {max} items can be combined, got {count}")]
    TooManyItems { count: usize, max: usize },

    #[error("item {item} was offered more than once")]
    DuplicateItem { item: RuntimeId },

    #[error("item {item} is not in the inventory")]
    ItemNotHeld { item: RuntimeId },
}

/// Checks the offered items against the bounds and the actor's inventory.
pub fn validate_offer(
    items: &[RuntimeId],
    inventory: &[RuntimeId],
) -> Result<(), CombinationRejection> {
    let count = items.len();
    if count < WorldConfig::MIN_COMBINATION_ITEMS {
        return Err(CombinationRejection::TooFewItems {
            count,
            min: WorldConfig::MIN_COMBINATION_ITEMS,
        });
    }
    if count > WorldConfig::MAX_COMBINATION_ITEMS {
        return Err(CombinationRejection::TooManyItems {
            count,
            max: WorldConfig::MAX_COMBINATION_ITEMS,
        });
    }

    let mut seen = HashSet::with_capacity(count);
    for item in items {
        if !seen.insert(item) {
            return Err(CombinationRejection::DuplicateItem { item: item.clone() });
        }
        if !inventory.contains(item) {
            return Err(CombinationRejection::ItemNotHeld { item: item.clone() });
        }
    }

    Ok(())
}

/// Rolls a combination and decides what it consumes.
///
/// On failure, inputs without carriers are consumed if there are any.
/// Otherwise a random minority (at least one, at most half) is lost.
pub fn plan_combination<R: Rng + ?Sized>(
    inputs: &[CombinationInput],
    rng: &mut R,
) -> CombinationRoll {
    let carrier_count = inputs.iter().filter(|i| i.is_carrier()).count();
    let probability = success_probability(inputs.len(), carrier_count);
    let roll: f64 = rng.gen_range(0.0..1.0);

    let plan = if roll < probability {
        let mut carriers: Vec<EffectId> = Vec::new();
        for effect in inputs.iter().flat_map(|i| &i.carriers) {
            if !carriers.contains(effect) {
                carriers.push(effect.clone());
            }
        }
        CombinationPlan::Success {
            consumed: inputs.iter().map(|i| i.item.clone()).collect(),
            carriers,
        }
    } else {
        CombinationPlan::Failure {
            consumed: failure_losses(inputs, rng),
        }
    };

    CombinationRoll {
        probability,
        roll,
        plan,
    }
}

fn failure_losses<R: Rng + ?Sized>(inputs: &[CombinationInput], rng: &mut R) -> Vec<RuntimeId> {
    let plain: Vec<RuntimeId> = inputs
        .iter()
        .filter(|i| !i.is_carrier())
        .map(|i| i.item.clone())
        .collect();
    if !plain.is_empty() {
        return plain;
    }

    let amount = (inputs.len() / 2).max(1);
    let chosen: HashSet<&RuntimeId> = inputs
        .choose_multiple(rng, amount)
        .map(|i| &i.item)
        .collect();

    // Keep offer order so callers see a stable list.
    inputs
        .iter()
        .filter(|i| chosen.contains(&i.item))
        .map(|i| i.item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn input(id: &str, carriers: &[&str]) -> CombinationInput {
        CombinationInput::new(
            RuntimeId::from(id),
            carriers.iter().copied().map(EffectId::from).collect(),
        )
    }

    #[test]
    fn probability_stays_in_bounds_for_every_legal_offer() {
        for items in WorldConfig::MIN_COMBINATION_ITEMS..=WorldConfig::MAX_COMBINATION_ITEMS {
            for carriers in 0..=items {
                let p = success_probability(items, carriers);
                assert!(
                    (WorldConfig::MIN_COMBINATION_CHANCE..=WorldConfig::MAX_COMBINATION_CHANCE)
                        .contains(&p),
                    "p={p} for items={items} carriers={carriers}"
                );
            }
        }
    }

    #[test]
    fn more_items_lower_the_chance_and_carriers_raise_it() {
        assert!(success_probability(2, 0) > success_probability(3, 0));
        assert!(success_probability(3, 2) > success_probability(3, 0));
        assert!((success_probability(2, 0) - 0.34).abs() < 1e-9);
        assert!((success_probability(5, 0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn offer_bounds_and_ownership_are_checked() {
        let held: Vec<RuntimeId> = ["a", "b", "c"].into_iter().map(RuntimeId::from).collect();

        assert!(matches!(
            validate_offer(&held[..1], &held),
            Err(CombinationRejection::TooFewItems { count: 1, .. })
        ));
        let six: Vec<RuntimeId> = (0..6).map(|i| RuntimeId::new(format!("i{i}"))).collect();
        assert!(matches!(
            validate_offer(&six, &six),
            Err(CombinationRejection::TooManyItems { count: 6, .. })
        ));
        assert!(matches!(
            validate_offer(&[held[0].clone(), held[0].clone()], &held),
            Err(CombinationRejection::DuplicateItem { .. })
        ));
        assert!(matches!(
            validate_offer(&[held[0].clone(), RuntimeId::from("z")], &held),
            Err(CombinationRejection::ItemNotHeld { .. })
        ));
        assert!(validate_offer(&held[..2], &held).is_ok());
    }

    #[test]
    fn failure_prefers_items_without_carriers() {
        let inputs = [input("a", &["fire"]), input("b", &[]), input("c", &[])];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..64 {
            let roll = plan_combination(&inputs, &mut rng);
            if let CombinationPlan::Failure { consumed } = roll.plan {
                assert_eq!(consumed, vec![RuntimeId::from("b"), RuntimeId::from("c")]);
            }
        }
    }

    #[test]
    fn failure_with_only_carriers_loses_a_minority() {
        let inputs = [
            input("a", &["fire"]),
            input("b", &["ice"]),
            input("c", &["wind"]),
            input("d", &["earth"]),
        ];
        let mut rng = StdRng::seed_from_u64(42);

        let mut failures = 0;
        for _ in 0..128 {
            let roll = plan_combination(&inputs, &mut rng);
            if let CombinationPlan::Failure { consumed } = roll.plan {
                failures += 1;
                assert!(!consumed.is_empty());
                assert!(consumed.len() * 2 <= inputs.len());
            }
        }
        assert!(failures > 0);
    }

    #[test]
    fn success_aggregates_distinct_carriers_and_consumes_everything() {
        let inputs = [input("a", &["fire", "ice"]), input("b", &["fire"])];
        let mut rng = StdRng::seed_from_u64(1);

        let success = (0..256)
            .map(|_| plan_combination(&inputs, &mut rng))
            .find(|roll| roll.plan.is_success())
            .expect("some roll succeeds");

        assert!(success.roll < success.probability);
        assert_eq!(
            success.plan,
            CombinationPlan::Success {
                consumed: vec![RuntimeId::from("a"), RuntimeId::from("b")],
                carriers: vec![EffectId::from("fire"), EffectId::from("ice")],
            }
        );
    }
}
