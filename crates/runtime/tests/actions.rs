//! Action listing and execution against the bundled world.

mod common;

use common::Scenario;
use world_core::{
    ActionDescriptor, ActionKind, ActionSource, EntityRole, GridPoint, InstanceKind, Position,
    RuleRejection, StatePatch, TemplateId,
};
use world_runtime::RuntimeError;

fn find<'a>(actions: &'a [ActionDescriptor], action: &str, template: &str) -> &'a ActionDescriptor {
    actions
        .iter()
        .find(|a| a.action == action && a.target.template_id.as_str() == template)
        .unwrap_or_else(|| panic!("no {action} on {template} in {actions:?}"))
}

#[test]
fn guard_room_lists_moves_then_objects() {
    let scenario = Scenario::start();
    let actions = scenario
        .world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();

    let summary: Vec<(&str, &str)> = actions
        .iter()
        .map(|a| (a.action.as_str(), a.target.template_id.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("move", "CELL_B"),
            ("light", "torch"),
            ("open", "chest"),
            ("pickup", "chest"),
            ("open", "iron_door"),
            ("close", "iron_door"),
        ]
    );

    let pickup = find(&actions, "pickup", "chest");
    assert_eq!(pickup.kind, ActionKind::Pickup);
    assert_eq!(pickup.source, ActionSource::Automatic);
    assert_eq!(pickup.label, "take from Old Chest");
}

#[test]
fn exits_resolve_to_session_cells_and_moving_follows_them() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let north = find(&actions, "move", "CELL_B").clone();
    assert_eq!(north.direction.as_deref(), Some("north"));

    let antechamber = world.describe_instance(&north.target.runtime_id).unwrap();
    assert_eq!(antechamber.record.kind, InstanceKind::Cell);
    assert_eq!(antechamber.record.session_id, scenario.session);

    let outcome = world.perform_action(&scenario.hero, &north).unwrap();
    assert!(outcome.success);
    assert_eq!(
        outcome.state.unwrap().cell_id(),
        Some(&north.target.runtime_id)
    );

    let back = world
        .list_available_actions(&scenario.hero, &north.target.runtime_id)
        .unwrap();
    let south = find(&back, "move", "CELL_A");
    assert_eq!(south.label, "back to the guard room");
    assert_eq!(south.target.runtime_id, scenario.guard_room);
    world.verify_occupancy(&scenario.session).unwrap();
}

#[test]
fn lighting_a_torch_twice_is_refused_the_second_time() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let light = find(&actions, "light", "torch").clone();

    let first = world.perform_action(&scenario.hero, &light).unwrap();
    assert!(first.success);
    assert_eq!(first.state.as_ref().unwrap().state, "lit");

    let relisted = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    assert!(!relisted.iter().any(|a| a.action == "light"));

    let second = world.perform_action(&scenario.hero, &light).unwrap();
    assert!(!second.success);
    assert!(matches!(
        second.rejection,
        Some(RuleRejection::NoOpTransition { ref state }) if state == "lit"
    ));

    let torch = world.get_effective_state(&light.target.runtime_id).unwrap();
    assert_eq!(torch.state, "lit");
}

#[test]
fn archetype_doors_open_once() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let open = find(&actions, "open", "iron_door").clone();
    assert_eq!(open.source, ActionSource::Archetype);

    assert!(world.perform_action(&scenario.hero, &open).unwrap().success);
    let again = world.perform_action(&scenario.hero, &open).unwrap();
    assert!(!again.success);

    let close = find(&actions, "close", "iron_door");
    assert!(world.perform_action(&scenario.hero, close).unwrap().success);
}

#[test]
fn pickup_moves_contents_into_the_inventory() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let pickup = find(&actions, "pickup", "chest").clone();
    let before = world.get_effective_state(&scenario.hero).unwrap().inventory;

    let outcome = world.perform_action(&scenario.hero, &pickup).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.created.len(), 2);

    let hero = world.get_effective_state(&scenario.hero).unwrap();
    assert_eq!(hero.inventory.len(), before.len() + 2);
    assert!(outcome.created.iter().all(|item| hero.holds(item)));

    let coin = world.describe_instance(&outcome.created[0]).unwrap();
    assert_eq!(coin.record.template_id, TemplateId::from("gold_coin"));

    // The chest is now explicitly empty, not back on its template contents.
    let chest = world.get_effective_state(&pickup.target.runtime_id).unwrap();
    assert!(chest.contents.is_empty());
    let relisted = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    assert!(!relisted.iter().any(|a| a.action == "pickup"));
}

#[test]
fn explicit_transition_graphs_gate_declared_rules() {
    let scenario = Scenario::start();
    let world = &scenario.world;

    let north = find(
        &world
            .list_available_actions(&scenario.hero, &scenario.guard_room)
            .unwrap(),
        "move",
        "CELL_B",
    )
    .clone();
    world.perform_action(&scenario.hero, &north).unwrap();
    let antechamber = north.target.runtime_id;

    let actions = world
        .list_available_actions(&scenario.hero, &antechamber)
        .unwrap();
    let unseal = find(&actions, "unseal", "vault_door").clone();
    // sealed -> open is not an edge of the graph.
    assert!(!actions.iter().any(|a| a.action == "open"));

    assert!(world.perform_action(&scenario.hero, &unseal).unwrap().success);

    let actions = world
        .list_available_actions(&scenario.hero, &antechamber)
        .unwrap();
    let open = find(&actions, "open", "vault_door").clone();
    let outcome = world.perform_action(&scenario.hero, &open).unwrap();
    assert_eq!(outcome.state.unwrap().state, "open");
}

#[test]
fn unknown_verbs_and_absent_targets_are_rejections() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();

    let mut dance = find(&actions, "light", "torch").clone();
    dance.action = "dance".to_owned();
    let outcome = world.perform_action(&scenario.hero, &dance).unwrap();
    assert!(!outcome.success);
    assert!(matches!(
        outcome.rejection,
        Some(RuleRejection::UnknownAction { .. })
    ));
}

#[test]
fn locked_chests_explain_their_required_state() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let open = find(&actions, "open", "chest").clone();

    world
        .apply_state_patch(&open.target.runtime_id, StatePatch::new().state("locked"))
        .unwrap();

    let outcome = world.perform_action(&scenario.hero, &open).unwrap();
    assert!(!outcome.success);
    assert!(matches!(
        outcome.rejection,
        Some(RuleRejection::RequiredState { ref required, ref current })
            if required == "closed" && current == "locked"
    ));
}

#[test]
fn listing_requires_the_actor_to_stand_in_the_cell() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    let elsewhere = world
        .resolve_or_create_cell(&scenario.session, &TemplateId::from("CELL_B"))
        .unwrap();

    assert!(matches!(
        world.list_available_actions(&scenario.hero, &elsewhere),
        Err(RuntimeError::ConstraintViolation(_))
    ));
}

#[test]
fn other_entities_in_the_cell_offer_their_verbs() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    world
        .resolve_or_create_entity(
            &scenario.session,
            &TemplateId::from("guard"),
            Position::new(scenario.guard_room.clone(), GridPoint::new(1, 0)),
            EntityRole::Npc,
        )
        .unwrap();

    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let talk = find(&actions, "talk", "guard");
    assert_eq!(actions.last(), Some(talk));
    assert!(world.perform_action(&scenario.hero, talk).unwrap().success);
}

#[test]
fn repeated_contents_list_one_instance_once() {
    let scenario = Scenario::start();
    let world = &scenario.world;
    world
        .apply_state_patch(
            &scenario.guard_room,
            StatePatch::new().contents(["torch", "torch"]),
        )
        .unwrap();

    let actions = world
        .list_available_actions(&scenario.hero, &scenario.guard_room)
        .unwrap();
    let lights: Vec<_> = actions.iter().filter(|a| a.action == "light").collect();
    assert_eq!(lights.len(), 1);
    assert_eq!(lights[0].target.template_id, TemplateId::from("torch"));
}
