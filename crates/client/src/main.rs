//! `world` binary.
//!
//! Composition root: loads content, builds a [`WorldRuntime`], places the
//! player in the start cell and prints what can be done there.
//!
//! # Usage
//!
//! ```bash
//! # List the actions available to the player
//! cargo run -p world-client
//!
//! # Perform one of them: verb and target template
//! cargo run -p world-client -- light torch
//!
//! # Combine everything the player holds
//! cargo run -p world-client -- combine
//! ```

mod config;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use world_content::ContentFactory;
use world_core::{EntityRole, GridPoint, Position, RuntimeId, WorldConfig};
use world_runtime::{RuntimeConfig, WorldRuntime};

use crate::config::ClientConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Load configuration from environment
    let client_config = ClientConfig::from_env();
    let session_label = client_config
        .session_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "default".to_owned());

    // 2. Setup logging
    let _guard = logging::setup_logging(&client_config.log_dir(), &session_label)?;

    // 3. Load content
    let content = match &client_config.content_dir {
        Some(dir) => ContentFactory::new(dir),
        None => ContentFactory::bundled(),
    };
    let world_config = content.load_config()?;
    let catalog = content.load_templates()?;
    let player_template = match &client_config.player_template {
        Some(id) => id.clone(),
        None => catalog
            .player_template()
            .map(|template| template.id.clone())
            .context("content defines no player template")?,
    };
    tracing::info!(
        content = %content.data_dir().display(),
        templates = catalog.len(),
        "content loaded"
    );

    // 4. Build runtime
    let world = WorldRuntime::builder()
        .config(RuntimeConfig::from_env(world_config))
        .templates(Arc::new(catalog))
        .build()?;

    // 5. Bootstrap session and player
    let session = world.open_session(client_config.session_id.clone())?;
    let start = world.resolve_or_create_cell(&session, &client_config.start_cell)?;
    let player = world.resolve_or_create_entity(
        &session,
        &player_template,
        Position::new(start, GridPoint::ORIGIN),
        EntityRole::Player,
    )?;
    tracing::info!(session = %session, player = %player, "player ready");

    // 6. Run the requested command
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => print_actions(&world, &player),
        [command] if command == "combine" => combine(&world, &player),
        [verb, target] => perform(&world, &player, verb, target),
        _ => bail!("usage: world [<action> <target-template> | combine]"),
    }
}

fn current_cell(world: &WorldRuntime, player: &RuntimeId) -> Result<RuntimeId> {
    world
        .get_effective_state(player)?
        .cell_id()
        .cloned()
        .context("player is not placed in any cell")
}

fn print_actions(world: &WorldRuntime, player: &RuntimeId) -> Result<()> {
    let cell = current_cell(world, player)?;
    let actions = world.list_available_actions(player, &cell)?;
    println!("{}", serde_json::to_string_pretty(&actions)?);
    Ok(())
}

fn perform(world: &WorldRuntime, player: &RuntimeId, verb: &str, target: &str) -> Result<()> {
    let cell = current_cell(world, player)?;
    let actions = world.list_available_actions(player, &cell)?;
    let descriptor = actions
        .iter()
        .find(|a| a.action == verb && a.target.template_id.as_str() == target)
        .with_context(|| format!("no '{verb}' on '{target}' here"))?;

    let outcome = world.perform_action(player, descriptor)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn combine(world: &WorldRuntime, player: &RuntimeId) -> Result<()> {
    let held = world.get_effective_state(player)?.inventory;
    let offer: Vec<RuntimeId> = held
        .into_iter()
        .take(WorldConfig::MAX_COMBINATION_ITEMS)
        .collect();

    let result = world.attempt_combination(player, &offer)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
