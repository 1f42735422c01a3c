//! Unified error type surfaced by the runtime API.
//!
//! Expected gameplay outcomes (a locked door, a failed combination) are not
//! errors; they come back as typed outcomes. These variants are failures the
//! caller has to handle.
use thiserror::Error;
use world_core::{EffectId, EffectValidationError, RuntimeId, SessionId, TemplateId};

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("template '{0}' not found")]
    TemplateNotFound(TemplateId),

    #[error("{template_id} slot {slot} already exists in session {session_id}")]
    DuplicateInstance {
        session_id: SessionId,
        template_id: TemplateId,
        slot: u32,
    },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("runtime instance '{0}' not found")]
    InstanceNotFound(RuntimeId),

    #[error("session '{0}' not found")]
    SessionNotFound(SessionId),

    #[error("session '{0}' is closed")]
    SessionClosed(SessionId),

    #[error("effect '{0}' not found")]
    EffectNotFound(EffectId),

    #[error("runtime requires a template store")]
    MissingTemplates,

    #[error("invalid effect definition: {0}")]
    InvalidEffect(#[from] EffectValidationError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl RuntimeError {
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

impl From<RepositoryError> for RuntimeError {
    fn from(err: RepositoryError) -> Self {
        if err.is_occupancy_guard() {
            return Self::InvariantViolation(err.to_string());
        }
        Self::Repository(err)
    }
}

impl From<rusqlite::Error> for RuntimeError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}
