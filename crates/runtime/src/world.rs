//! World runtime façade and its builder.
//!
//! [`WorldRuntime`] owns one SQLite store and the services built on it. Every
//! service shares the store and the state cache, so a write through any of
//! them is visible to the others on the next read.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use world_core::{
    EffectCarrierDefinition, EffectDraft, EffectId, EffectiveState, EntityRole, GridPoint,
    InstanceKind, Position, RuntimeId, SessionId, StatePatch, TemplateDefinition, TemplateId,
    TemplateStore,
};

use crate::config::RuntimeConfig;
use crate::consistency::{ConsistencyEnforcer, OccupancyAudit};
use crate::effects::{EffectRegistry, OwnedEffect};
use crate::error::{Result, RuntimeError};
use crate::factory::InstanceFactory;
use crate::guard;
use crate::repository::{
    InstanceRecord, InstanceReference, OccupancyEntry, SessionRecord, SqliteStore, instances,
    sessions,
};
use crate::resolver::ReferenceResolver;
use crate::state::{StateCache, StateManager};

/// Identity, reference and merged state of one instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub record: InstanceRecord,
    pub reference: InstanceReference,
    pub state: EffectiveState,
}

/// Session-scoped world instancing over a SQLite store.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct WorldRuntime {
    pub(crate) config: RuntimeConfig,
    pub(crate) store: Arc<SqliteStore>,
    pub(crate) templates: Arc<dyn TemplateStore>,
    pub(crate) resolver: ReferenceResolver,
    pub(crate) states: StateManager,
    pub(crate) enforcer: ConsistencyEnforcer,
    pub(crate) effects: EffectRegistry,
    pub(crate) rng: Mutex<StdRng>,
}

impl WorldRuntime {
    pub fn builder() -> WorldRuntimeBuilder {
        WorldRuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    pub fn templates(&self) -> &Arc<dyn TemplateStore> {
        &self.templates
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn states(&self) -> &StateManager {
        &self.states
    }

    pub fn enforcer(&self) -> &ConsistencyEnforcer {
        &self.enforcer
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Opens a session, generating an id when none is given.
    ///
    /// Reopening an active session returns it unchanged; a closed session
    /// cannot be reopened.
    pub fn open_session(&self, id: Option<SessionId>) -> Result<SessionId> {
        let id = id.unwrap_or_else(|| SessionId::new(Uuid::new_v4().to_string()));

        let created = self.store.write(|tx| {
            match sessions::find_session(tx, &id)? {
                Some(existing) if existing.is_active() => Ok::<_, RuntimeError>(false),
                Some(_) => Err(RuntimeError::SessionClosed(id.clone())),
                None => {
                    sessions::insert_session(tx, &id)?;
                    Ok(true)
                }
            }
        })?;

        if created {
            tracing::info!(session = %id, "session opened");
        }
        Ok(id)
    }

    /// Closes a session. Its data stays readable; writes are refused.
    pub fn close_session(&self, id: &SessionId) -> Result<()> {
        let closed = self.store.write(|tx| {
            guard::session(tx, id)?;
            Ok::<_, RuntimeError>(sessions::close_session(tx, id)?)
        })?;
        if closed {
            tracing::info!(session = %id, "session closed");
        }
        Ok(())
    }

    pub fn session(&self, id: &SessionId) -> Result<SessionRecord> {
        self.store.read(|conn| guard::session(conn, id))
    }

    // ------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------

    pub fn resolve_or_create_cell(
        &self,
        session: &SessionId,
        template: &TemplateId,
    ) -> Result<RuntimeId> {
        self.resolver.resolve_or_create_cell(session, template)
    }

    pub fn resolve_or_create_object(
        &self,
        session: &SessionId,
        template: &TemplateId,
    ) -> Result<RuntimeId> {
        self.resolver.resolve_or_create_object(session, template)
    }

    pub fn resolve_or_create_entity(
        &self,
        session: &SessionId,
        template: &TemplateId,
        position: Position,
        role: EntityRole,
    ) -> Result<RuntimeId> {
        self.resolver
            .resolve_or_create_entity(session, template, position, role)
    }

    pub fn create_item_instance(
        &self,
        session: &SessionId,
        template: &TemplateId,
    ) -> Result<RuntimeId> {
        self.resolver.create_item_instance(session, template)
    }

    pub fn list_instances(
        &self,
        session: &SessionId,
        kind: Option<InstanceKind>,
    ) -> Result<Vec<InstanceRecord>> {
        self.resolver.list_instances(session, kind)
    }

    pub fn describe_instance(&self, id: &RuntimeId) -> Result<InstanceDescription> {
        let (record, reference) = self.store.read(|conn| {
            let record = guard::instance(conn, id)?;
            let reference = instances::get_reference(conn, id)?.ok_or_else(|| {
                RuntimeError::invariant(format!("instance {id} has no reference row"))
            })?;
            Ok::<_, RuntimeError>((record, reference))
        })?;

        Ok(InstanceDescription {
            state: self.states.get_effective_state(id)?,
            record,
            reference,
        })
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn get_effective_state(&self, id: &RuntimeId) -> Result<EffectiveState> {
        self.states.get_effective_state(id)
    }

    pub fn apply_state_patch(&self, id: &RuntimeId, patch: StatePatch) -> Result<EffectiveState> {
        self.states.apply_state_patch(id, patch)
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    pub fn move_entity(
        &self,
        entity: &RuntimeId,
        target_cell: &RuntimeId,
        point: GridPoint,
    ) -> Result<Position> {
        self.enforcer.move_entity(entity, target_cell, point)
    }

    pub fn occupants(&self, cell: &RuntimeId) -> Result<Vec<OccupancyEntry>> {
        self.enforcer.occupants(cell)
    }

    pub fn verify_occupancy(&self, session: &SessionId) -> Result<OccupancyAudit> {
        self.enforcer.verify_session(session)
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    pub fn create_effect_definition(&self, draft: EffectDraft) -> Result<EffectCarrierDefinition> {
        self.effects.create_effect_definition(draft)
    }

    pub fn get_effect_definition(&self, id: &EffectId) -> Result<EffectCarrierDefinition> {
        self.effects.get_effect_definition(id)
    }

    pub fn update_effect_definition(
        &self,
        definition: EffectCarrierDefinition,
    ) -> Result<EffectCarrierDefinition> {
        self.effects.update_effect_definition(definition)
    }

    pub fn delete_effect_definition(&self, id: &EffectId) -> Result<()> {
        self.effects.delete_effect_definition(id)
    }

    pub fn list_effect_definitions(&self) -> Result<Vec<EffectCarrierDefinition>> {
        self.effects.list_effect_definitions()
    }

    pub fn grant_effect(
        &self,
        session: &SessionId,
        owner: &RuntimeId,
        effect: &EffectId,
        source: &str,
    ) -> Result<bool> {
        self.effects.grant(session, owner, effect, source)
    }

    pub fn revoke_effect(
        &self,
        session: &SessionId,
        owner: &RuntimeId,
        effect: &EffectId,
    ) -> Result<bool> {
        self.effects.revoke(session, owner, effect)
    }

    pub fn list_effects(&self, session: &SessionId, owner: &RuntimeId) -> Result<Vec<OwnedEffect>> {
        self.effects.list_effects(session, owner)
    }

    pub fn carriers_of(&self, session: &SessionId, owner: &RuntimeId) -> Result<Vec<EffectId>> {
        self.effects.carriers_of(session, owner)
    }

    pub(crate) fn template(&self, id: &TemplateId) -> Result<&TemplateDefinition> {
        self.templates
            .template(id)
            .ok_or_else(|| RuntimeError::TemplateNotFound(id.clone()))
    }
}

/// Builder for [`WorldRuntime`].
pub struct WorldRuntimeBuilder {
    config: RuntimeConfig,
    templates: Option<Arc<dyn TemplateStore>>,
    store: Option<Arc<SqliteStore>>,
}

impl WorldRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            templates: None,
            store: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the required template store
    pub fn templates(mut self, templates: Arc<dyn TemplateStore>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Use an already opened store instead of `config.db_path`
    pub fn store(mut self, store: Arc<SqliteStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<WorldRuntime> {
        let templates = self.templates.ok_or(RuntimeError::MissingTemplates)?;
        let config = self.config;

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(match &config.db_path {
                Some(path) => SqliteStore::open(path, config.busy_timeout)?,
                None => SqliteStore::in_memory()?,
            }),
        };

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let state_cache = Arc::new(StateCache::new("states", config.state_cache_capacity));
        let factory = InstanceFactory::new(Arc::clone(&templates));

        tracing::debug!(
            db = ?store.path(),
            templates = templates.templates().len(),
            "world runtime ready"
        );

        Ok(WorldRuntime {
            resolver: ReferenceResolver::new(Arc::clone(&store), factory),
            states: StateManager::new(
                Arc::clone(&store),
                Arc::clone(&templates),
                config.world.clone(),
                Arc::clone(&state_cache),
            ),
            enforcer: ConsistencyEnforcer::new(Arc::clone(&store), state_cache),
            effects: EffectRegistry::new(Arc::clone(&store), config.effect_cache_capacity),
            rng: Mutex::new(rng),
            templates,
            store,
            config,
        })
    }
}
