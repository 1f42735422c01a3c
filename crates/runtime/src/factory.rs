//! Instance factory: one generic materialization path for every kind.
//!
//! Kind-specific work is described by a [`SeedPlan`]. Cells and objects get
//! only their identity rows; their state documents appear on first patch.
//! Entities are seeded with a document (position, starting inventory) and an
//! occupancy entry in the same transaction as their identity.

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;
use world_core::{
    EntityRole, InstanceKind, Position, RuntimeId, RuntimeStateDocument, SessionId,
    TemplateDefinition, TemplateId, TemplateStore,
};

use crate::consistency;
use crate::error::{Result, RuntimeError};
use crate::guard;
use crate::repository::{InstanceRecord, InstanceReference, InstanceStatus, instances, timestamp};

/// Kind-specific seed for a new instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedPlan {
    Cell,
    Object,
    Entity { position: Position, role: EntityRole },
    /// An object minted into an inventory; takes the next free slot.
    Item,
}

impl SeedPlan {
    pub fn kind(&self) -> InstanceKind {
        match self {
            Self::Cell => InstanceKind::Cell,
            Self::Entity { .. } => InstanceKind::Entity,
            Self::Object | Self::Item => InstanceKind::Object,
        }
    }
}

pub(crate) struct InstanceFactory {
    templates: Arc<dyn TemplateStore>,
}

impl InstanceFactory {
    pub(crate) fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self { templates }
    }

    /// Looks up a template and checks it materializes as `kind`.
    pub(crate) fn template_for(
        &self,
        id: &TemplateId,
        kind: InstanceKind,
    ) -> Result<&TemplateDefinition> {
        let template = self
            .templates
            .template(id)
            .ok_or_else(|| RuntimeError::TemplateNotFound(id.clone()))?;
        if template.kind != kind {
            return Err(RuntimeError::constraint(format!(
                "template {id} is a {}, cannot instance it as a {kind}",
                template.kind
            )));
        }
        Ok(template)
    }

    /// Writes identity, reference and seeds for a new instance.
    ///
    /// Fails with [`RuntimeError::DuplicateInstance`] if the slot is taken.
    pub(crate) fn materialize(
        &self,
        conn: &Connection,
        session: &SessionId,
        template: &TemplateDefinition,
        slot: u32,
        seed: &SeedPlan,
    ) -> Result<RuntimeId> {
        let record = InstanceRecord {
            runtime_id: RuntimeId::new(Uuid::new_v4().to_string()),
            session_id: session.clone(),
            template_id: template.id.clone(),
            kind: seed.kind(),
            slot,
            status: InstanceStatus::Active,
            created_at: timestamp(),
        };

        if !instances::insert_instance(conn, &record)? {
            return Err(RuntimeError::DuplicateInstance {
                session_id: session.clone(),
                template_id: template.id.clone(),
                slot,
            });
        }

        let role = match seed {
            SeedPlan::Entity { role, .. } => Some(*role),
            _ => None,
        };
        instances::insert_reference(
            conn,
            &InstanceReference {
                runtime_id: record.runtime_id.clone(),
                session_id: session.clone(),
                template_id: template.id.clone(),
                kind: record.kind,
                is_player: template.is_player || role == Some(EntityRole::Player),
                role,
            },
        )?;

        if let SeedPlan::Entity { position, .. } = seed {
            self.seed_entity(conn, &record, template, position.clone())?;
        }

        tracing::info!(
            session = %session,
            template = %template.id,
            kind = %record.kind,
            slot,
            runtime_id = %record.runtime_id,
            "instance created"
        );
        Ok(record.runtime_id)
    }

    /// Mints a fresh object instance in the next free slot.
    pub(crate) fn create_item(
        &self,
        conn: &Connection,
        session: &SessionId,
        template_id: &TemplateId,
    ) -> Result<RuntimeId> {
        let template = self.template_for(template_id, InstanceKind::Object)?;
        let slot = instances::next_slot(conn, session, InstanceKind::Object, template_id)?;
        self.materialize(conn, session, template, slot, &SeedPlan::Item)
    }

    fn seed_entity(
        &self,
        conn: &Connection,
        record: &InstanceRecord,
        template: &TemplateDefinition,
        position: Position,
    ) -> Result<()> {
        let cell = guard::writable(conn, &position.runtime_cell_id, Some(InstanceKind::Cell))?;
        guard::same_session(record, &cell)?;

        let mut document = RuntimeStateDocument::new();
        if !template.inventory.is_empty() {
            let mut items = Vec::with_capacity(template.inventory.len());
            for item in &template.inventory {
                items.push(self.create_item(conn, &record.session_id, item)?);
            }
            document.inventory = Some(items);
        }

        consistency::place_new(
            conn,
            &record.session_id,
            &record.runtime_id,
            &mut document,
            position,
        )
    }
}
