//! Preconditions shared by the services, checked inside their transactions.

use rusqlite::Connection;
use world_core::{InstanceKind, RuntimeId, SessionId};

use crate::error::{Result, RuntimeError};
use crate::repository::{InstanceRecord, SessionRecord, instances, sessions};

pub(crate) fn session(conn: &Connection, id: &SessionId) -> Result<SessionRecord> {
    sessions::find_session(conn, id)?.ok_or_else(|| RuntimeError::SessionNotFound(id.clone()))
}

pub(crate) fn active_session(conn: &Connection, id: &SessionId) -> Result<SessionRecord> {
    let record = session(conn, id)?;
    if !record.is_active() {
        return Err(RuntimeError::SessionClosed(id.clone()));
    }
    Ok(record)
}

pub(crate) fn instance(conn: &Connection, id: &RuntimeId) -> Result<InstanceRecord> {
    instances::get_instance(conn, id)?.ok_or_else(|| RuntimeError::InstanceNotFound(id.clone()))
}

/// An active instance of `kind` in an active session.
///
/// A closed session is reported before the retirement it implies.
pub(crate) fn writable(
    conn: &Connection,
    id: &RuntimeId,
    kind: Option<InstanceKind>,
) -> Result<InstanceRecord> {
    let record = instance(conn, id)?;
    if let Some(expected) = kind {
        of_kind(&record, expected)?;
    }
    active_session(conn, &record.session_id)?;
    if !record.is_active() {
        return Err(RuntimeError::constraint(format!("instance {id} is retired")));
    }
    Ok(record)
}

pub(crate) fn of_kind(record: &InstanceRecord, expected: InstanceKind) -> Result<()> {
    if record.kind != expected {
        return Err(RuntimeError::constraint(format!(
            "instance {} is a {}, expected a {}",
            record.runtime_id, record.kind, expected
        )));
    }
    Ok(())
}

pub(crate) fn same_session(a: &InstanceRecord, b: &InstanceRecord) -> Result<()> {
    if a.session_id != b.session_id {
        return Err(RuntimeError::constraint(format!(
            "instances {} and {} belong to different sessions",
            a.runtime_id, b.runtime_id
        )));
    }
    Ok(())
}
