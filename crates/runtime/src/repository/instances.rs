//! Runtime instance identity rows and their references.

use rusqlite::{Connection, OptionalExtension, Row, params};
use world_core::{EntityRole, InstanceKind, RuntimeId, SessionId, TemplateId};

use crate::repository::types::parse_label;
use crate::repository::{
    InstanceRecord, InstanceReference, InstanceStatus, RepositoryError, Result,
};

const INSTANCE_COLUMNS: &str =
    "runtime_id, session_id, template_id, kind, slot, status, created_at";

type RawInstance = (String, String, String, String, i64, String, String);

fn raw_instance(row: &Row<'_>) -> rusqlite::Result<RawInstance> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_record(raw: RawInstance) -> Result<InstanceRecord> {
    let (runtime_id, session_id, template_id, kind, slot, status, created_at) = raw;
    Ok(InstanceRecord {
        runtime_id: RuntimeId::from(runtime_id),
        session_id: SessionId::from(session_id),
        template_id: TemplateId::from(template_id),
        kind: parse_label("instance kind", &kind)?,
        slot: u32::try_from(slot).map_err(|_| {
            RepositoryError::CorruptedData(format!("negative slot {slot}"))
        })?,
        status: parse_label("instance status", &status)?,
        created_at,
    })
}

/// Looks up the instance occupying a (session, kind, template, slot) key.
pub(crate) fn find_instance(
    conn: &Connection,
    session: &SessionId,
    kind: InstanceKind,
    template: &TemplateId,
    slot: u32,
) -> Result<Option<InstanceRecord>> {
    conn.query_row(
        &format!(
            "SELECT {INSTANCE_COLUMNS} FROM runtime_instances
             WHERE session_id = ?1 AND kind = ?2 AND template_id = ?3 AND slot = ?4"
        ),
        params![session.as_str(), kind.as_ref(), template.as_str(), slot],
        raw_instance,
    )
    .optional()?
    .map(into_record)
    .transpose()
}

pub(crate) fn get_instance(conn: &Connection, id: &RuntimeId) -> Result<Option<InstanceRecord>> {
    conn.query_row(
        &format!("SELECT {INSTANCE_COLUMNS} FROM runtime_instances WHERE runtime_id = ?1"),
        params![id.as_str()],
        raw_instance,
    )
    .optional()?
    .map(into_record)
    .transpose()
}

/// Inserts an identity row unless its key is already taken.
///
/// Returns `false` when another writer got there first.
pub(crate) fn insert_instance(conn: &Connection, record: &InstanceRecord) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO runtime_instances
            (runtime_id, session_id, template_id, kind, slot, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (session_id, kind, template_id, slot) DO NOTHING",
        params![
            record.runtime_id.as_str(),
            record.session_id.as_str(),
            record.template_id.as_str(),
            record.kind.as_ref(),
            record.slot,
            record.status.as_ref(),
            record.created_at,
        ],
    )?;
    Ok(inserted > 0)
}

/// Next free slot above the default one for a template in a session.
pub(crate) fn next_slot(
    conn: &Connection,
    session: &SessionId,
    kind: InstanceKind,
    template: &TemplateId,
) -> Result<u32> {
    let highest: Option<i64> = conn.query_row(
        "SELECT MAX(slot) FROM runtime_instances
         WHERE session_id = ?1 AND kind = ?2 AND template_id = ?3",
        params![session.as_str(), kind.as_ref(), template.as_str()],
        |row| row.get(0),
    )?;
    let next = highest.unwrap_or(0).max(0) + 1;
    u32::try_from(next)
        .map_err(|_| RepositoryError::CorruptedData(format!("slot {next}")))
}

pub(crate) fn list_instances(
    conn: &Connection,
    session: &SessionId,
    kind: Option<InstanceKind>,
) -> Result<Vec<InstanceRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSTANCE_COLUMNS} FROM runtime_instances
         WHERE session_id = ?1 AND (?2 IS NULL OR kind = ?2)
         ORDER BY created_at ASC, rowid ASC"
    ))?;

    let rows = stmt.query_map(
        params![session.as_str(), kind.map(|k| k.as_ref().to_owned())],
        raw_instance,
    )?;

    let mut records = Vec::new();
    for row in rows {
        records.push(into_record(row?)?);
    }
    Ok(records)
}

/// Marks an instance retired. Returns `false` if it already was.
pub(crate) fn retire_instance(conn: &Connection, id: &RuntimeId) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE runtime_instances SET status = ?2 WHERE runtime_id = ?1 AND status = ?3",
        params![
            id.as_str(),
            InstanceStatus::Retired.as_ref(),
            InstanceStatus::Active.as_ref(),
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn insert_reference(conn: &Connection, reference: &InstanceReference) -> Result<()> {
    conn.execute(
        "INSERT INTO instance_references
            (runtime_id, session_id, template_id, kind, is_player, role)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            reference.runtime_id.as_str(),
            reference.session_id.as_str(),
            reference.template_id.as_str(),
            reference.kind.as_ref(),
            reference.is_player,
            reference.role.map(|r| r.as_ref().to_owned()),
        ],
    )?;
    Ok(())
}

pub(crate) fn get_reference(
    conn: &Connection,
    id: &RuntimeId,
) -> Result<Option<InstanceReference>> {
    let row = conn
        .query_row(
            "SELECT session_id, template_id, kind, is_player, role
             FROM instance_references WHERE runtime_id = ?1",
            params![id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(session_id, template_id, kind, is_player, role)| {
        Ok(InstanceReference {
            runtime_id: id.clone(),
            session_id: SessionId::from(session_id),
            template_id: TemplateId::from(template_id),
            kind: parse_label("reference kind", &kind)?,
            is_player,
            role: role
                .map(|r| parse_label::<EntityRole>("entity role", &r))
                .transpose()?,
        })
    })
    .transpose()
}
