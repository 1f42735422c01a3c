//! Occupancy index rows.
//!
//! Writes take an [`OccupancyWrite`] token, which only the consistency
//! enforcer can mint. The schema triggers back this up for raw SQL.

use rusqlite::{Connection, OptionalExtension, params};
use world_core::{RuntimeId, SessionId};

use crate::consistency::OccupancyWrite;
use crate::repository::{OccupancyEntry, Result, timestamp};

pub(crate) fn insert_occupancy(
    conn: &Connection,
    _token: &OccupancyWrite,
    session: &SessionId,
    entity: &RuntimeId,
    cell: &RuntimeId,
) -> Result<OccupancyEntry> {
    let entered_at = timestamp();
    conn.execute(
        "INSERT INTO occupancy_index (entity_runtime_id, cell_runtime_id, session_id, entered_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![entity.as_str(), cell.as_str(), session.as_str(), entered_at],
    )?;

    Ok(OccupancyEntry {
        cell_runtime_id: cell.clone(),
        entity_runtime_id: entity.clone(),
        entered_at,
    })
}

pub(crate) fn remove_occupancy(
    conn: &Connection,
    _token: &OccupancyWrite,
    entity: &RuntimeId,
) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM occupancy_index WHERE entity_runtime_id = ?1",
        params![entity.as_str()],
    )?;
    Ok(removed > 0)
}

pub(crate) fn occupancy_of(conn: &Connection, entity: &RuntimeId) -> Result<Option<OccupancyEntry>> {
    let entry = conn
        .query_row(
            "SELECT cell_runtime_id, entered_at FROM occupancy_index WHERE entity_runtime_id = ?1",
            params![entity.as_str()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    Ok(entry.map(|(cell, entered_at)| OccupancyEntry {
        cell_runtime_id: RuntimeId::from(cell),
        entity_runtime_id: entity.clone(),
        entered_at,
    }))
}

/// Entities in a cell, in order of arrival.
pub(crate) fn occupants(conn: &Connection, cell: &RuntimeId) -> Result<Vec<OccupancyEntry>> {
    let mut stmt = conn.prepare(
        "SELECT entity_runtime_id, entered_at FROM occupancy_index
         WHERE cell_runtime_id = ?1
         ORDER BY entered_at ASC, entity_runtime_id ASC",
    )?;
    let rows = stmt.query_map(params![cell.as_str()], |row| {
        Ok(OccupancyEntry {
            cell_runtime_id: cell.clone(),
            entity_runtime_id: RuntimeId::from(row.get::<_, String>(0)?),
            entered_at: row.get(1)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

pub(crate) fn session_occupancy(
    conn: &Connection,
    session: &SessionId,
) -> Result<Vec<OccupancyEntry>> {
    let mut stmt = conn.prepare(
        "SELECT cell_runtime_id, entity_runtime_id, entered_at FROM occupancy_index
         WHERE session_id = ?1
         ORDER BY entity_runtime_id",
    )?;
    let rows = stmt.query_map(params![session.as_str()], |row| {
        Ok(OccupancyEntry {
            cell_runtime_id: RuntimeId::from(row.get::<_, String>(0)?),
            entity_runtime_id: RuntimeId::from(row.get::<_, String>(1)?),
            entered_at: row.get(2)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}
