#![allow(dead_code)]

use std::sync::Arc;

use world_content::{ContentFactory, TemplateCatalog};
use world_core::{EntityRole, GridPoint, Position, RuntimeId, SessionId, TemplateId, TemplateStore};
use world_runtime::{RuntimeConfig, WorldRuntime};

pub fn bundled_catalog() -> TemplateCatalog {
    ContentFactory::bundled()
        .load_templates()
        .expect("bundled templates load")
}

pub fn runtime_with(templates: Arc<dyn TemplateStore>, config: RuntimeConfig) -> WorldRuntime {
    WorldRuntime::builder()
        .config(config)
        .templates(templates)
        .build()
        .expect("runtime builds")
}

pub fn bundled_runtime() -> WorldRuntime {
    runtime_with(
        Arc::new(bundled_catalog()),
        RuntimeConfig::default().with_rng_seed(7),
    )
}

/// A session with the hero standing in the guard room.
pub struct Scenario {
    pub world: WorldRuntime,
    pub session: SessionId,
    pub guard_room: RuntimeId,
    pub hero: RuntimeId,
}

impl Scenario {
    pub fn start() -> Self {
        Self::start_in(bundled_runtime())
    }

    pub fn start_in(world: WorldRuntime) -> Self {
        let session = world.open_session(None).expect("session opens");
        let guard_room = world
            .resolve_or_create_cell(&session, &TemplateId::from("CELL_A"))
            .expect("guard room resolves");
        let hero = world
            .resolve_or_create_entity(
                &session,
                &TemplateId::from("hero"),
                Position::new(guard_room.clone(), GridPoint::ORIGIN),
                EntityRole::Player,
            )
            .expect("hero resolves");

        Self {
            world,
            session,
            guard_room,
            hero,
        }
    }
}
