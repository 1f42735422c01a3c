//! Effect carrier registry: definitions, ownership grants and their cache.

use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use world_core::{EffectCarrierDefinition, EffectDraft, EffectId, RuntimeId, SessionId};

use crate::cache::ReadThroughCache;
use crate::error::{Result, RuntimeError};
use crate::guard;
use crate::repository::{SqliteStore, effects};

pub type EffectCache = ReadThroughCache<EffectId, EffectCarrierDefinition>;

/// An effect held by an instance, with how it was acquired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedEffect {
    pub definition: EffectCarrierDefinition,
    pub acquired_at: String,
    pub source: String,
}

pub struct EffectRegistry {
    store: Arc<SqliteStore>,
    cache: EffectCache,
}

impl EffectRegistry {
    pub(crate) fn new(store: Arc<SqliteStore>, capacity: usize) -> Self {
        Self {
            store,
            cache: EffectCache::new("effects", capacity),
        }
    }

    pub fn create_effect_definition(&self, draft: EffectDraft) -> Result<EffectCarrierDefinition> {
        draft.validate()?;
        let definition = draft.into_definition(EffectId::new(Uuid::new_v4().to_string()));

        self.store
            .write(|tx| Ok::<_, RuntimeError>(effects::insert_effect(tx, &definition)?))?;
        tracing::info!(effect = %definition.id, name = %definition.name, "effect defined");
        Ok(definition)
    }

    /// Reads a definition through the cache.
    pub fn get_effect_definition(&self, id: &EffectId) -> Result<EffectCarrierDefinition> {
        self.cache.get_or_load(id, || {
            self.store
                .read(|conn| Ok::<_, RuntimeError>(effects::get_effect(conn, id)?))?
                .ok_or_else(|| RuntimeError::EffectNotFound(id.clone()))
        })
    }

    pub fn update_effect_definition(
        &self,
        definition: EffectCarrierDefinition,
    ) -> Result<EffectCarrierDefinition> {
        definition.validate()?;

        let updated = self
            .store
            .write(|tx| Ok::<_, RuntimeError>(effects::update_effect(tx, &definition)?))?;
        self.cache.invalidate(&definition.id);
        if !updated {
            return Err(RuntimeError::EffectNotFound(definition.id));
        }
        tracing::debug!(effect = %definition.id, "effect updated");
        Ok(definition)
    }

    /// Deletes a definition along with every grant of it.
    pub fn delete_effect_definition(&self, id: &EffectId) -> Result<()> {
        let removed = self
            .store
            .write(|tx| Ok::<_, RuntimeError>(effects::delete_effect(tx, id)?))?;
        self.cache.invalidate(id);
        if !removed {
            return Err(RuntimeError::EffectNotFound(id.clone()));
        }
        tracing::debug!(effect = %id, "effect deleted");
        Ok(())
    }

    pub fn list_effect_definitions(&self) -> Result<Vec<EffectCarrierDefinition>> {
        self.store
            .read(|conn| Ok::<_, RuntimeError>(effects::list_effects(conn)?))
    }

    /// Gives `owner` the effect. Granting twice is a no-op.
    ///
    /// Returns whether a new grant was recorded.
    pub fn grant(
        &self,
        session: &SessionId,
        owner: &RuntimeId,
        effect: &EffectId,
        source: &str,
    ) -> Result<bool> {
        let granted = self
            .store
            .write(|tx| grant_in(tx, session, owner, effect, source))?;
        if granted {
            tracing::info!(session = %session, owner = %owner, effect = %effect, source, "effect granted");
        }
        Ok(granted)
    }

    /// Removes ownership. Revoking an absent grant is a no-op.
    pub fn revoke(&self, session: &SessionId, owner: &RuntimeId, effect: &EffectId) -> Result<bool> {
        let revoked = self.store.write(|tx| {
            guard::active_session(tx, session)?;
            Ok::<_, RuntimeError>(effects::delete_grant(tx, session, owner, effect)?)
        })?;
        if revoked {
            tracing::info!(session = %session, owner = %owner, effect = %effect, "effect revoked");
        }
        Ok(revoked)
    }

    /// Effects held by `owner`, newest first.
    pub fn list_effects(&self, session: &SessionId, owner: &RuntimeId) -> Result<Vec<OwnedEffect>> {
        let grants = self.store.read(|conn| {
            guard::session(conn, session)?;
            Ok::<_, RuntimeError>(effects::grants_of(conn, session, owner)?)
        })?;

        grants
            .into_iter()
            .map(|grant| {
                Ok(OwnedEffect {
                    definition: self.get_effect_definition(&grant.effect_id)?,
                    acquired_at: grant.acquired_at,
                    source: grant.source,
                })
            })
            .collect()
    }

    /// Ids of the effects `owner` carries, newest first.
    pub fn carriers_of(&self, session: &SessionId, owner: &RuntimeId) -> Result<Vec<EffectId>> {
        self.store.read(|conn| carriers_in(conn, session, owner))
    }

    pub fn cache(&self) -> &EffectCache {
        &self.cache
    }
}

pub(crate) fn grant_in(
    conn: &Connection,
    session: &SessionId,
    owner: &RuntimeId,
    effect: &EffectId,
    source: &str,
) -> Result<bool> {
    guard::active_session(conn, session)?;
    let record = guard::instance(conn, owner)?;
    if &record.session_id != session {
        return Err(RuntimeError::constraint(format!(
            "instance {owner} does not belong to session {session}"
        )));
    }
    if effects::get_effect(conn, effect)?.is_none() {
        return Err(RuntimeError::EffectNotFound(effect.clone()));
    }
    Ok(effects::upsert_grant(conn, session, owner, effect, source)?)
}

pub(crate) fn carriers_in(
    conn: &Connection,
    session: &SessionId,
    owner: &RuntimeId,
) -> Result<Vec<EffectId>> {
    Ok(effects::grants_of(conn, session, owner)?
        .into_iter()
        .map(|grant| grant.effect_id)
        .collect())
}
