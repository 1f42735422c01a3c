//! Reference resolver: idempotent get-or-create of runtime identities.

use std::sync::Arc;

use world_core::{EntityRole, InstanceKind, Position, RuntimeId, SessionId, TemplateId};

use crate::error::{Result, RuntimeError};
use crate::factory::{InstanceFactory, SeedPlan};
use crate::guard;
use crate::repository::{InstanceRecord, SqliteStore, instances};

/// Slot of the default instance of a template in a session.
pub const DEFAULT_SLOT: u32 = 0;

pub struct ReferenceResolver {
    store: Arc<SqliteStore>,
    factory: InstanceFactory,
}

impl ReferenceResolver {
    pub(crate) fn new(store: Arc<SqliteStore>, factory: InstanceFactory) -> Self {
        Self { store, factory }
    }

    pub fn resolve_or_create_cell(
        &self,
        session: &SessionId,
        template: &TemplateId,
    ) -> Result<RuntimeId> {
        self.resolve_or_create(session, template, SeedPlan::Cell)
    }

    pub fn resolve_or_create_object(
        &self,
        session: &SessionId,
        template: &TemplateId,
    ) -> Result<RuntimeId> {
        self.resolve_or_create(session, template, SeedPlan::Object)
    }

    /// Returns the session's entity for `template`, creating and placing it
    /// at `position` if it does not exist yet. An existing entity is not
    /// moved.
    pub fn resolve_or_create_entity(
        &self,
        session: &SessionId,
        template: &TemplateId,
        position: Position,
        role: EntityRole,
    ) -> Result<RuntimeId> {
        self.resolve_or_create(session, template, SeedPlan::Entity { position, role })
    }

    /// Generic get-or-create on the default slot.
    ///
    /// Everything the new instance needs is written in one transaction. A
    /// creation race lost to another writer resolves to the winner's id.
    pub fn resolve_or_create(
        &self,
        session: &SessionId,
        template_id: &TemplateId,
        seed: SeedPlan,
    ) -> Result<RuntimeId> {
        let kind = seed.kind();
        let template = self.factory.template_for(template_id, kind)?;

        self.store.write(|tx| {
            guard::active_session(tx, session)?;

            if let Some(existing) =
                instances::find_instance(tx, session, kind, template_id, DEFAULT_SLOT)?
            {
                return Ok(existing.runtime_id);
            }

            match self
                .factory
                .materialize(tx, session, template, DEFAULT_SLOT, &seed)
            {
                Err(RuntimeError::DuplicateInstance { .. }) => {
                    tracing::debug!(
                        session = %session,
                        template = %template_id,
                        "creation race lost, returning winner"
                    );
                    instances::find_instance(tx, session, kind, template_id, DEFAULT_SLOT)?
                        .map(|winner| winner.runtime_id)
                        .ok_or_else(|| {
                            RuntimeError::invariant(format!(
                                "{template_id} conflicted in {session} but no row is visible"
                            ))
                        })
                }
                other => other,
            }
        })
    }

    /// Mints an extra object instance of `template` (next free slot).
    pub fn create_item_instance(
        &self,
        session: &SessionId,
        template: &TemplateId,
    ) -> Result<RuntimeId> {
        self.store.write(|tx| {
            guard::active_session(tx, session)?;
            self.factory.create_item(tx, session, template)
        })
    }

    /// Identity rows of a session, oldest first, optionally of one kind.
    pub fn list_instances(
        &self,
        session: &SessionId,
        kind: Option<InstanceKind>,
    ) -> Result<Vec<InstanceRecord>> {
        self.store.read(|conn| {
            guard::session(conn, session)?;
            Ok(instances::list_instances(conn, session, kind)?)
        })
    }

    pub(crate) fn factory(&self) -> &InstanceFactory {
        &self.factory
    }
}
