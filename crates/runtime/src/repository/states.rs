//! Runtime state documents.

use rusqlite::{Connection, OptionalExtension, params};
use world_core::{InstanceKind, Position, RuntimeId, RuntimeStateDocument, SessionId};

use crate::repository::{Result, timestamp};

pub(crate) fn load_document(
    conn: &Connection,
    id: &RuntimeId,
) -> Result<Option<RuntimeStateDocument>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT document FROM runtime_states WHERE runtime_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Inserts or replaces the document of an instance.
pub(crate) fn save_document(
    conn: &Connection,
    id: &RuntimeId,
    session: &SessionId,
    document: &RuntimeStateDocument,
) -> Result<()> {
    let json = serde_json::to_string(document)?;
    let version = i64::try_from(document.version).unwrap_or(i64::MAX);

    conn.execute(
        "INSERT INTO runtime_states (runtime_id, session_id, document, version, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (runtime_id) DO UPDATE SET
            document = excluded.document,
            version = excluded.version,
            updated_at = excluded.updated_at",
        params![id.as_str(), session.as_str(), json, version, timestamp()],
    )?;
    Ok(())
}

/// Recorded position of every entity in a session, retired ones included.
///
/// Closing a session retires its entities but keeps their index entries.
pub(crate) fn entity_positions(
    conn: &Connection,
    session: &SessionId,
) -> Result<Vec<(RuntimeId, Option<Position>)>> {
    let mut stmt = conn.prepare(
        "SELECT i.runtime_id, s.document
         FROM runtime_instances i
         LEFT JOIN runtime_states s ON s.runtime_id = i.runtime_id
         WHERE i.session_id = ?1 AND i.kind = ?2
         ORDER BY i.runtime_id",
    )?;

    let rows = stmt.query_map(
        params![session.as_str(), InstanceKind::Entity.as_ref()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
    )?;

    let mut positions = Vec::new();
    for row in rows {
        let (id, json) = row?;
        let position = match json {
            Some(json) => serde_json::from_str::<RuntimeStateDocument>(&json)?.current_position,
            None => None,
        };
        positions.push((RuntimeId::from(id), position));
    }
    Ok(positions)
}
