//! Session-scoped world instancing on top of SQLite.
//!
//! This crate turns the static templates of `world-core` into runtime
//! instances, keeps their state, and resolves actions against it. Consumers
//! build a [`WorldRuntime`] and call everything through it.
//!
//! Modules are organized by responsibility:
//! - [`world`] hosts the façade and its builder
//! - [`resolver`] and [`factory`] get-or-create runtime identities
//! - [`state`] merges templates with overrides behind a read-through [`cache`]
//! - [`consistency`] is the only writer of positions and occupancy
//! - [`effects`] keeps effect definitions and who holds them
//! - [`actions`] and [`combination`] apply world-core rules to stored state
//! - [`repository`] holds the SQLite schema and queries
pub mod actions;
pub mod cache;
pub mod combination;
pub mod config;
pub mod consistency;
pub mod effects;
pub mod error;
pub mod factory;
pub mod repository;
pub mod resolver;
pub mod state;
pub mod world;

mod guard;

pub use actions::ActionOutcome;
pub use cache::ReadThroughCache;
pub use combination::CombinationResult;
pub use config::RuntimeConfig;
pub use consistency::{ConsistencyEnforcer, OccupancyAudit, OccupancyWrite};
pub use effects::{EffectCache, EffectRegistry, OwnedEffect};
pub use error::{RepositoryError, Result, RuntimeError};
pub use factory::SeedPlan;
pub use repository::{
    EffectGrant, InstanceRecord, InstanceReference, InstanceStatus, OccupancyEntry,
    SessionRecord, SessionStatus, SqliteStore,
};
pub use resolver::{DEFAULT_SLOT, ReferenceResolver};
pub use state::{StateCache, StateManager};
pub use world::{InstanceDescription, WorldRuntime, WorldRuntimeBuilder};
