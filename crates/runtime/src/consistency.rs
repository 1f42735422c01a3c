//! Single writer path for entity positions.
//!
//! `current_position` in the state document is authoritative. The occupancy
//! index is derived from it and only ever written here, in the same
//! transaction as the position. Writers elsewhere cannot obtain the
//! [`OccupancyWrite`] token; raw SQL is refused by the schema triggers.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use world_core::{GridPoint, InstanceKind, Position, RuntimeId, RuntimeStateDocument, SessionId};

use crate::error::{Result, RuntimeError};
use crate::guard;
use crate::repository::{OccupancyEntry, SqliteStore, occupancy, states};
use crate::state::StateCache;

/// Capability to write the occupancy index.
pub struct OccupancyWrite {
    _sealed: (),
}

impl OccupancyWrite {
    fn mint() -> Self {
        Self { _sealed: () }
    }
}

/// Result of auditing one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyAudit {
    pub entities: usize,
    pub placed: usize,
}

pub struct ConsistencyEnforcer {
    store: Arc<SqliteStore>,
    states: Arc<StateCache>,
}

impl ConsistencyEnforcer {
    pub(crate) fn new(store: Arc<SqliteStore>, states: Arc<StateCache>) -> Self {
        Self { store, states }
    }

    /// Moves an entity into `target_cell` at `point`.
    ///
    /// Position and occupancy change in one `IMMEDIATE` transaction, so
    /// concurrent moves of the same entity are serialized by the store and
    /// the last committed one wins.
    pub fn move_entity(
        &self,
        entity: &RuntimeId,
        target_cell: &RuntimeId,
        point: GridPoint,
    ) -> Result<Position> {
        let (position, previous) = self.store.write(|tx| {
            let mover = guard::writable(tx, entity, Some(InstanceKind::Entity))?;
            let cell = guard::writable(tx, target_cell, Some(InstanceKind::Cell))?;
            guard::same_session(&mover, &cell)?;

            let mut document = states::load_document(tx, entity)?.unwrap_or_default();
            let previous = document.current_position.clone();
            let position = Position::new(target_cell.clone(), point);
            relocate(tx, &mover.session_id, entity, &mut document, position.clone())?;
            Ok::<_, RuntimeError>((position, previous))
        })?;

        self.states.invalidate(entity);
        tracing::info!(
            entity = %entity,
            from = ?previous.map(|p| p.runtime_cell_id),
            to = %position.runtime_cell_id,
            "entity moved"
        );
        Ok(position)
    }

    /// Entities currently in `cell`, in order of arrival.
    pub fn occupants(&self, cell: &RuntimeId) -> Result<Vec<OccupancyEntry>> {
        self.store.read(|conn| {
            let record = guard::instance(conn, cell)?;
            guard::of_kind(&record, InstanceKind::Cell)?;
            Ok(occupancy::occupants(conn, cell)?)
        })
    }

    /// Occupancy row of an entity, if it is placed anywhere.
    pub fn location_of(&self, entity: &RuntimeId) -> Result<Option<OccupancyEntry>> {
        self.store.read(|conn| {
            guard::instance(conn, entity)?;
            Ok(occupancy::occupancy_of(conn, entity)?)
        })
    }

    /// Checks that the occupancy index matches every recorded position.
    ///
    /// Stops at the first mismatch and reports it; nothing is repaired.
    pub fn verify_session(&self, session: &SessionId) -> Result<OccupancyAudit> {
        let (positions, entries) = self.store.read(|conn| {
            guard::session(conn, session)?;
            let positions = states::entity_positions(conn, session)?;
            let entries = occupancy::session_occupancy(conn, session)?;
            Ok::<_, RuntimeError>((positions, entries))
        })?;

        let mut indexed: HashMap<RuntimeId, RuntimeId> = entries
            .into_iter()
            .map(|e| (e.entity_runtime_id, e.cell_runtime_id))
            .collect();

        let mut audit = OccupancyAudit {
            entities: positions.len(),
            placed: 0,
        };

        for (entity, position) in positions {
            let recorded = position.map(|p| p.runtime_cell_id);
            let index = indexed.remove(&entity);
            if recorded != index {
                let message = format!(
                    "entity {entity} is recorded in {recorded:?} but indexed in {index:?}"
                );
                tracing::error!(session = %session, %message, "occupancy mismatch");
                return Err(RuntimeError::invariant(message));
            }
            if recorded.is_some() {
                audit.placed += 1;
            }
        }

        if let Some((entity, cell)) = indexed.into_iter().next() {
            let message = format!("index places {entity} in {cell} but it has no position");
            tracing::error!(session = %session, %message, "occupancy mismatch");
            return Err(RuntimeError::invariant(message));
        }

        Ok(audit)
    }
}

/// Places a newly created entity inside an open creation transaction.
pub(crate) fn place_new(
    conn: &Connection,
    session: &SessionId,
    entity: &RuntimeId,
    document: &mut RuntimeStateDocument,
    position: Position,
) -> Result<()> {
    relocate(conn, session, entity, document, position)
}

fn relocate(
    conn: &Connection,
    session: &SessionId,
    entity: &RuntimeId,
    document: &mut RuntimeStateDocument,
    position: Position,
) -> Result<()> {
    let token = OccupancyWrite::mint();
    let previous = document
        .current_position
        .as_ref()
        .map(|p| p.runtime_cell_id.clone());
    let target = position.runtime_cell_id.clone();

    // The document goes first: the triggers compare the index against it.
    document.set_position(position);
    document.touch();
    states::save_document(conn, entity, session, document)?;

    if previous.as_ref() == Some(&target) {
        return Ok(());
    }
    if previous.is_some() {
        occupancy::remove_occupancy(conn, &token, entity)?;
    }
    occupancy::insert_occupancy(conn, &token, session, entity, &target)?;
    Ok(())
}
