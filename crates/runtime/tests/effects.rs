//! Effect definitions, grants and combination.

mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

use common::Scenario;
use world_core::{
    CarrierType, CombinationRejection, EffectDraft, EffectId, RuntimeId, TemplateId,
    WorldConfig,
};
use world_runtime::RuntimeError;

fn ember() -> EffectDraft {
    EffectDraft::new("Ember", CarrierType::Passive, json!({"fire": 2})).with_tag("fire")
}

fn frost() -> EffectDraft {
    EffectDraft::new("Frost", CarrierType::Trigger, json!({"cold": 1}))
}

fn inventory(scenario: &Scenario) -> Vec<RuntimeId> {
    scenario
        .world
        .get_effective_state(&scenario.hero)
        .unwrap()
        .inventory
}

#[test]
fn definitions_round_trip_through_the_cache() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    let created = world.create_effect_definition(ember()).unwrap();
    assert_eq!(world.get_effect_definition(&created.id).unwrap(), created);
    assert_eq!(world.get_effect_definition(&created.id).unwrap(), created);
    assert_eq!(world.effects().cache().len(), 1);

    let mut renamed = created.clone();
    renamed.name = "Blaze".to_owned();
    world.update_effect_definition(renamed).unwrap();
    assert_eq!(
        world.get_effect_definition(&created.id).unwrap().name,
        "Blaze"
    );

    world.delete_effect_definition(&created.id).unwrap();
    assert!(matches!(
        world.get_effect_definition(&created.id),
        Err(RuntimeError::EffectNotFound(_))
    ));
    assert!(world.list_effect_definitions().unwrap().is_empty());
}

#[test]
fn invalid_or_missing_definitions_are_refused() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    assert!(matches!(
        world.create_effect_definition(EffectDraft::new(" ", CarrierType::Active, json!(1))),
        Err(RuntimeError::InvalidEffect(_))
    ));

    let mut ghost = world.create_effect_definition(frost()).unwrap();
    world.delete_effect_definition(&ghost.id).unwrap();
    ghost.name = "Ghost".to_owned();
    assert!(matches!(
        world.update_effect_definition(ghost.clone()),
        Err(RuntimeError::EffectNotFound(_))
    ));
    assert!(matches!(
        world.delete_effect_definition(&ghost.id),
        Err(RuntimeError::EffectNotFound(_))
    ));
}

#[test]
fn grants_list_newest_first_and_are_idempotent() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let first = world.create_effect_definition(ember()).unwrap();
    let second = world.create_effect_definition(frost()).unwrap();

    assert!(world.grant_effect(&scenario.session, &scenario.hero, &first.id, "shrine").unwrap());
    assert!(world.grant_effect(&scenario.session, &scenario.hero, &second.id, "trap").unwrap());
    assert!(!world.grant_effect(&scenario.session, &scenario.hero, &first.id, "again").unwrap());

    let owned = world.list_effects(&scenario.session, &scenario.hero).unwrap();
    let names: Vec<&str> = owned.iter().map(|o| o.definition.name.as_str()).collect();
    assert_eq!(names, vec!["Frost", "Ember"]);
    assert_eq!(owned[1].source, "shrine");

    assert_eq!(
        world.carriers_of(&scenario.session, &scenario.hero).unwrap(),
        vec![second.id.clone(), first.id.clone()]
    );

    assert!(world.revoke_effect(&scenario.session, &scenario.hero, &second.id).unwrap());
    assert!(!world.revoke_effect(&scenario.session, &scenario.hero, &second.id).unwrap());

    // Deleting a definition drops every grant of it.
    world.delete_effect_definition(&first.id).unwrap();
    assert!(world.list_effects(&scenario.session, &scenario.hero).unwrap().is_empty());
}

#[test]
fn grants_check_effect_and_owner_session() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let effect = world.create_effect_definition(ember()).unwrap();

    assert!(matches!(
        world.grant_effect(&scenario.session, &scenario.hero, &EffectId::from("nope"), "x"),
        Err(RuntimeError::EffectNotFound(_))
    ));

    let other = world.open_session(None).unwrap();
    assert!(matches!(
        world.grant_effect(&other, &scenario.hero, &effect.id, "x"),
        Err(RuntimeError::ConstraintViolation(_))
    ));
}

#[test]
fn combination_offers_are_validated_before_rolling() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let held = inventory(&scenario);

    let single = world.attempt_combination(&scenario.hero, &held[..1]).unwrap();
    assert!(!single.success);
    assert!(matches!(
        single.rejection,
        Some(CombinationRejection::TooFewItems { count: 1, .. })
    ));
    assert!(single.roll.is_none());

    let stranger = world
        .create_item_instance(&scenario.session, &TemplateId::from("gold_coin"))
        .unwrap();
    let foreign = world
        .attempt_combination(&scenario.hero, &[held[0].clone(), stranger])
        .unwrap();
    assert!(matches!(
        foreign.rejection,
        Some(CombinationRejection::ItemNotHeld { .. })
    ));

    // Nothing was consumed by refused offers.
    assert_eq!(inventory(&scenario), held);
}

#[test]
fn combination_outcomes_follow_the_roll() {
    let mut successes = 0;
    let mut failures = 0;

    for seed in 0..48 {
        let scenario = Scenario::start();
        let world = &scenario.world;
        let held = inventory(&scenario);
        let (herb, stone) = (held[0].clone(), held[1].clone());

        let effect = world.create_effect_definition(ember()).unwrap();
        world
            .grant_effect(&scenario.session, &stone, &effect.id, "forge")
            .unwrap();

        let mut rng = StdRng::seed_from_u64(seed);
        let result = world
            .attempt_combination_with(&scenario.hero, &held, &mut rng)
            .unwrap();
        assert!((result.probability - 0.37).abs() < 1e-9);

        let after = inventory(&scenario);
        if result.success {
            successes += 1;
            assert!(result.roll.unwrap() < result.probability);
            assert_eq!(result.consumed, vec![herb.clone(), stone.clone()]);
            let product = result.created.clone().unwrap();
            assert_eq!(after, vec![product.clone()]);

            let description = world.describe_instance(&product).unwrap();
            assert_eq!(
                description.record.template_id,
                TemplateId::from(WorldConfig::DEFAULT_COMBINATION_TEMPLATE)
            );
            let owned = world.list_effects(&scenario.session, &product).unwrap();
            assert_eq!(owned.len(), 1);
            assert_eq!(owned[0].definition.id, effect.id);
            assert_eq!(owned[0].source, WorldConfig::DEFAULT_GRANT_SOURCE);
        } else {
            failures += 1;
            assert!(result.roll.unwrap() >= result.probability);
            // Only the item without carriers is lost.
            assert_eq!(result.consumed, vec![herb.clone()]);
            assert_eq!(after, vec![stone.clone()]);
            assert!(result.created.is_none());
        }

        for consumed in &result.consumed {
            assert!(!world.describe_instance(consumed).unwrap().record.is_active());
        }
        world.verify_occupancy(&scenario.session).unwrap();
    }

    assert!(successes > 0, "no success in 48 seeded rolls");
    assert!(failures > 0, "no failure in 48 seeded rolls");
}

#[test]
fn consumed_items_cannot_be_offered_again() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let held = inventory(&scenario);

    let first = world.attempt_combination(&scenario.hero, &held).unwrap();
    assert!(first.rejection.is_none());

    let again = world.attempt_combination(&scenario.hero, &held).unwrap();
    assert!(matches!(
        again.rejection,
        Some(CombinationRejection::ItemNotHeld { .. })
    ));
}
