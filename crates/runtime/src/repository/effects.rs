//! Effect carrier definitions and ownership grants.

use rusqlite::{Connection, OptionalExtension, params};
use world_core::{EffectCarrierDefinition, EffectId, RuntimeId, SessionId};

use crate::repository::{EffectGrant, Result, timestamp};

pub(crate) fn insert_effect(conn: &Connection, definition: &EffectCarrierDefinition) -> Result<()> {
    let json = serde_json::to_string(definition)?;
    let now = timestamp();
    conn.execute(
        "INSERT INTO effect_carriers (effect_id, name, carrier_type, definition, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            definition.id.as_str(),
            definition.name,
            definition.carrier_type.as_ref(),
            json,
            now,
        ],
    )?;
    Ok(())
}

/// Replaces a stored definition. Returns `false` if the id is unknown.
pub(crate) fn update_effect(conn: &Connection, definition: &EffectCarrierDefinition) -> Result<bool> {
    let json = serde_json::to_string(definition)?;
    let changed = conn.execute(
        "UPDATE effect_carriers
         SET name = ?2, carrier_type = ?3, definition = ?4, updated_at = ?5
         WHERE effect_id = ?1",
        params![
            definition.id.as_str(),
            definition.name,
            definition.carrier_type.as_ref(),
            json,
            timestamp(),
        ],
    )?;
    Ok(changed > 0)
}

/// Deletes a definition and, through the foreign key, every grant of it.
pub(crate) fn delete_effect(conn: &Connection, id: &EffectId) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM effect_carriers WHERE effect_id = ?1",
        params![id.as_str()],
    )?;
    Ok(removed > 0)
}

pub(crate) fn get_effect(
    conn: &Connection,
    id: &EffectId,
) -> Result<Option<EffectCarrierDefinition>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT definition FROM effect_carriers WHERE effect_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub(crate) fn list_effects(conn: &Connection) -> Result<Vec<EffectCarrierDefinition>> {
    let mut stmt =
        conn.prepare("SELECT definition FROM effect_carriers ORDER BY name ASC, effect_id ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut definitions = Vec::new();
    for row in rows {
        definitions.push(serde_json::from_str(&row?)?);
    }
    Ok(definitions)
}

/// Records ownership unless it already exists.
///
/// Returns `true` for a new grant. An existing grant keeps its original
/// acquisition time and source.
pub(crate) fn upsert_grant(
    conn: &Connection,
    session: &SessionId,
    owner: &RuntimeId,
    effect: &EffectId,
    source: &str,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO effect_ownership (session_id, owner_runtime_id, effect_id, acquired_at, source)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (session_id, owner_runtime_id, effect_id) DO NOTHING",
        params![
            session.as_str(),
            owner.as_str(),
            effect.as_str(),
            timestamp(),
            source,
        ],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn delete_grant(
    conn: &Connection,
    session: &SessionId,
    owner: &RuntimeId,
    effect: &EffectId,
) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM effect_ownership
         WHERE session_id = ?1 AND owner_runtime_id = ?2 AND effect_id = ?3",
        params![session.as_str(), owner.as_str(), effect.as_str()],
    )?;
    Ok(removed > 0)
}

/// Grants held by an owner, newest first.
pub(crate) fn grants_of(
    conn: &Connection,
    session: &SessionId,
    owner: &RuntimeId,
) -> Result<Vec<EffectGrant>> {
    let mut stmt = conn.prepare(
        "SELECT effect_id, acquired_at, source FROM effect_ownership
         WHERE session_id = ?1 AND owner_runtime_id = ?2
         ORDER BY acquired_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![session.as_str(), owner.as_str()], |row| {
        Ok(EffectGrant {
            session_id: session.clone(),
            owner: owner.clone(),
            effect_id: EffectId::from(row.get::<_, String>(0)?),
            acquired_at: row.get(1)?,
            source: row.get(2)?,
        })
    })?;

    let mut grants = Vec::new();
    for row in rows {
        grants.push(row?);
    }
    Ok(grants)
}
