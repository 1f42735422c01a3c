//! Session rows.

use rusqlite::{Connection, OptionalExtension, params};
use world_core::SessionId;

use crate::repository::types::parse_label;
use crate::repository::{InstanceStatus, Result, SessionRecord, SessionStatus, timestamp};

pub(crate) fn insert_session(conn: &Connection, id: &SessionId) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (session_id, status, created_at) VALUES (?1, ?2, ?3)",
        params![id.as_str(), SessionStatus::Active.as_ref(), timestamp()],
    )?;
    Ok(())
}

pub(crate) fn find_session(conn: &Connection, id: &SessionId) -> Result<Option<SessionRecord>> {
    let row = conn
        .query_row(
            "SELECT status, created_at, closed_at FROM sessions WHERE session_id = ?1",
            params![id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(status, created_at, closed_at)| {
        Ok(SessionRecord {
            id: id.clone(),
            status: parse_label("session status", &status)?,
            created_at,
            closed_at,
        })
    })
    .transpose()
}

/// Marks a session closed and retires every instance it still owns.
///
/// Returns `false` if it was already closed.
pub(crate) fn close_session(conn: &Connection, id: &SessionId) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE sessions SET status = ?2, closed_at = ?3
         WHERE session_id = ?1 AND status = ?4",
        params![
            id.as_str(),
            SessionStatus::Closed.as_ref(),
            timestamp(),
            SessionStatus::Active.as_ref(),
        ],
    )?;
    if changed == 0 {
        return Ok(false);
    }

    conn.execute(
        "UPDATE runtime_instances SET status = ?2 WHERE session_id = ?1 AND status = ?3",
        params![
            id.as_str(),
            InstanceStatus::Retired.as_ref(),
            InstanceStatus::Active.as_ref(),
        ],
    )?;
    Ok(true)
}
