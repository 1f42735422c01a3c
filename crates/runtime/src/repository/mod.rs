//! Repository layer for dynamic runtime data.
//!
//! Everything that changes during a session lives here, in three groups:
//! - references: `runtime_instances`, `instance_references`
//! - runtime: `runtime_states`, `occupancy_index`
//! - effects: `effect_carriers`, `effect_ownership`
//!
//! Templates are static content and never stored here.

mod error;
mod schema;
mod store;
mod types;

pub(crate) mod effects;
pub(crate) mod instances;
pub(crate) mod occupancy;
pub(crate) mod sessions;
pub(crate) mod states;

pub use error::{RepositoryError, Result};
pub use store::SqliteStore;
pub use types::{
    EffectGrant, InstanceRecord, InstanceReference, InstanceStatus, OccupancyEntry,
    SessionRecord, SessionStatus,
};

use chrono::{SecondsFormat, Utc};

/// UTC timestamp with microsecond precision; sorts lexically.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
