//! Concurrent writers over one database file.

mod common;

use std::sync::Arc;
use std::thread;

use common::{bundled_catalog, runtime_with};
use tempfile::TempDir;
use world_core::{EntityRole, GridPoint, Position, SessionId, TemplateId, TemplateStore};
use world_runtime::{RuntimeConfig, WorldRuntime};

fn file_runtime(dir: &TempDir, templates: Arc<dyn TemplateStore>) -> WorldRuntime {
    runtime_with(
        templates,
        RuntimeConfig::default().with_db_path(dir.path().join("world.db")),
    )
}

#[test]
fn racing_resolvers_agree_on_one_identity() {
    let dir = TempDir::new().unwrap();
    let templates: Arc<dyn TemplateStore> = Arc::new(bundled_catalog());
    let runtimes: Vec<WorldRuntime> = (0..4)
        .map(|_| file_runtime(&dir, Arc::clone(&templates)))
        .collect();

    let session = runtimes[0]
        .open_session(Some(SessionId::from("shared")))
        .unwrap();

    let ids: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = runtimes
            .iter()
            .map(|world| {
                let session = session.clone();
                scope.spawn(move || {
                    (0..8)
                        .map(|_| {
                            world
                                .resolve_or_create_cell(&session, &TemplateId::from("CELL_A"))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    let cells = runtimes[1].list_instances(&session, None).unwrap();
    assert_eq!(cells.len(), 1);
}

#[test]
fn concurrent_moves_leave_a_consistent_index() {
    let dir = TempDir::new().unwrap();
    let world = file_runtime(&dir, Arc::new(bundled_catalog()));
    let session = world.open_session(None).unwrap();

    let a = world
        .resolve_or_create_cell(&session, &TemplateId::from("CELL_A"))
        .unwrap();
    let b = world
        .resolve_or_create_cell(&session, &TemplateId::from("CELL_B"))
        .unwrap();
    let hero = world
        .resolve_or_create_entity(
            &session,
            &TemplateId::from("hero"),
            Position::new(a.clone(), GridPoint::ORIGIN),
            EntityRole::Player,
        )
        .unwrap();

    thread::scope(|scope| {
        for worker in 0..4 {
            let (world, hero, a, b) = (&world, &hero, &a, &b);
            scope.spawn(move || {
                for step in 0..16 {
                    let target = if (worker + step) % 2 == 0 { a } else { b };
                    world
                        .move_entity(hero, target, GridPoint::new(worker, step))
                        .unwrap();
                }
            });
        }
    });

    let audit = world.verify_occupancy(&session).unwrap();
    assert_eq!(audit.placed, 1);

    let state = world.get_effective_state(&hero).unwrap();
    let location = world.enforcer().location_of(&hero).unwrap().unwrap();
    assert_eq!(state.cell_id(), Some(&location.cell_runtime_id));
    // Start document plus one version per move.
    assert_eq!(state.version, 1 + 4 * 16);
}

#[test]
fn data_survives_reopening_the_file() {
    let dir = TempDir::new().unwrap();
    let templates: Arc<dyn TemplateStore> = Arc::new(bundled_catalog());

    let (session, cell) = {
        let world = file_runtime(&dir, Arc::clone(&templates));
        let session = world.open_session(None).unwrap();
        let cell = world
            .resolve_or_create_cell(&session, &TemplateId::from("CELL_A"))
            .unwrap();
        (session, cell)
    };

    let reopened = file_runtime(&dir, templates);
    assert_eq!(
        reopened
            .resolve_or_create_cell(&session, &TemplateId::from("CELL_A"))
            .unwrap(),
        cell
    );
}
