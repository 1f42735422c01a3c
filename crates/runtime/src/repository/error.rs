//! Error types raised by the SQLite store.

use thiserror::Error;

/// Message raised by the occupancy triggers in the schema.
pub(crate) const OCCUPANCY_GUARD: &str = "occupancy_invariant";

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("store connection lock was poisoned")]
    LockPoisoned,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl RepositoryError {
    /// Whether the store refused a write to the occupancy index that does
    /// not match the entity's recorded position.
    pub fn is_occupancy_guard(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message))) => {
                message.contains(OCCUPANCY_GUARD)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
