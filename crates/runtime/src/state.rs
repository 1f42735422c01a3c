//! Effective state reads and state patches.

use std::sync::Arc;

use rusqlite::Connection;
use world_core::{
    EffectiveState, RuntimeId, RuntimeStateDocument, StatePatch, TemplateStore, WorldConfig,
    merge_state,
};

use crate::cache::ReadThroughCache;
use crate::error::{Result, RuntimeError};
use crate::guard;
use crate::repository::{InstanceRecord, SqliteStore, states};

/// Effective states keyed by runtime id. Runtime ids are unique across
/// sessions, so the key carries the session implicitly.
pub type StateCache = ReadThroughCache<RuntimeId, EffectiveState>;

pub struct StateManager {
    store: Arc<SqliteStore>,
    templates: Arc<dyn TemplateStore>,
    config: WorldConfig,
    cache: Arc<StateCache>,
}

impl StateManager {
    pub(crate) fn new(
        store: Arc<SqliteStore>,
        templates: Arc<dyn TemplateStore>,
        config: WorldConfig,
        cache: Arc<StateCache>,
    ) -> Self {
        Self {
            store,
            templates,
            config,
            cache,
        }
    }

    /// Template defaults merged with the instance's overrides.
    pub fn get_effective_state(&self, id: &RuntimeId) -> Result<EffectiveState> {
        self.cache.get_or_load(id, || {
            let (record, document) = self.store.read(|conn| {
                let record = guard::instance(conn, id)?;
                let document = states::load_document(conn, id)?;
                Ok::<_, RuntimeError>((record, document))
            })?;
            self.merge(&record, document.as_ref())
        })
    }

    /// Merges `patch` into the instance's document and persists it.
    ///
    /// The document is created on first write. Patches cannot touch
    /// `current_position`; use the consistency enforcer to move entities.
    pub fn apply_state_patch(&self, id: &RuntimeId, patch: StatePatch) -> Result<EffectiveState> {
        let state = self.store.write(|tx| {
            let record = guard::writable(tx, id, None)?;
            let document = patch_document(tx, &record, patch)?;
            self.merge(&record, Some(&document))
        })?;

        self.cache.invalidate(id);
        tracing::debug!(runtime_id = %id, version = state.version, "state patched");
        Ok(state)
    }

    /// Drops the cached state of an instance.
    pub fn invalidate(&self, id: &RuntimeId) {
        self.cache.invalidate(id);
    }

    pub(crate) fn merge(
        &self,
        record: &InstanceRecord,
        document: Option<&RuntimeStateDocument>,
    ) -> Result<EffectiveState> {
        let template = self
            .templates
            .template(&record.template_id)
            .ok_or_else(|| RuntimeError::TemplateNotFound(record.template_id.clone()))?;
        Ok(merge_state(
            &record.runtime_id,
            template,
            document,
            &self.config,
        ))
    }

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.cache
    }
}

/// Applies a patch inside an open transaction and returns the saved document.
pub(crate) fn patch_document(
    conn: &Connection,
    record: &InstanceRecord,
    patch: StatePatch,
) -> Result<RuntimeStateDocument> {
    if patch.touches_position() {
        return Err(RuntimeError::invariant(format!(
            "patch on {} writes current_position outside the move path",
            record.runtime_id
        )));
    }

    let mut document = states::load_document(conn, &record.runtime_id)?.unwrap_or_default();
    document
        .apply(patch)
        .map_err(|err| RuntimeError::invariant(err.to_string()))?;
    document.touch();
    states::save_document(conn, &record.runtime_id, &record.session_id, &document)?;
    Ok(document)
}
