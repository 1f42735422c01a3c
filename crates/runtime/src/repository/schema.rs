//! Connection setup and schema migration.

use std::time::Duration;

use rusqlite::Connection;

use crate::repository::Result;

pub(crate) const SCHEMA_VERSION: i64 = 1;

pub(crate) fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // In-memory databases report "memory" and stay that way.
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    Ok(())
}

pub(crate) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            status TEXT NOT NULL CHECK (status IN ('active', 'closed')),
            created_at TEXT NOT NULL,
            closed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS runtime_instances (
            runtime_id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
            template_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('cell', 'entity', 'object')),
            slot INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'retired')),
            created_at TEXT NOT NULL,
            UNIQUE (session_id, kind, template_id, slot)
        );

        CREATE TABLE IF NOT EXISTS instance_references (
            runtime_id TEXT PRIMARY KEY
                REFERENCES runtime_instances(runtime_id) ON DELETE CASCADE,
            session_id TEXT NOT NULL,
            template_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            is_player INTEGER NOT NULL DEFAULT 0,
            role TEXT
        );

        CREATE TABLE IF NOT EXISTS runtime_states (
            runtime_id TEXT PRIMARY KEY
                REFERENCES runtime_instances(runtime_id) ON DELETE CASCADE,
            session_id TEXT NOT NULL,
            document TEXT NOT NULL,
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS occupancy_index (
            entity_runtime_id TEXT PRIMARY KEY
                REFERENCES runtime_instances(runtime_id) ON DELETE CASCADE,
            cell_runtime_id TEXT NOT NULL
                REFERENCES runtime_instances(runtime_id) ON DELETE CASCADE,
            session_id TEXT NOT NULL,
            entered_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS effect_carriers (
            effect_id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            carrier_type TEXT NOT NULL,
            definition TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS effect_ownership (
            session_id TEXT NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
            owner_runtime_id TEXT NOT NULL
                REFERENCES runtime_instances(runtime_id) ON DELETE CASCADE,
            effect_id TEXT NOT NULL REFERENCES effect_carriers(effect_id) ON DELETE CASCADE,
            acquired_at TEXT NOT NULL,
            source TEXT NOT NULL,
            PRIMARY KEY (session_id, owner_runtime_id, effect_id)
        );

        CREATE INDEX IF NOT EXISTS idx_instances_session_kind
            ON runtime_instances(session_id, kind, status);
        CREATE INDEX IF NOT EXISTS idx_occupancy_cell ON occupancy_index(cell_runtime_id);
        CREATE INDEX IF NOT EXISTS idx_occupancy_session ON occupancy_index(session_id);
        CREATE INDEX IF NOT EXISTS idx_ownership_owner
            ON effect_ownership(session_id, owner_runtime_id, acquired_at);

        -- The occupancy index mirrors current_position. Entries may only be
        -- inserted for, or removed from, the cell the document says.
        CREATE TRIGGER IF NOT EXISTS occupancy_insert_guard
        BEFORE INSERT ON occupancy_index
        WHEN NOT EXISTS (
            SELECT 1 FROM runtime_states
            WHERE runtime_id = NEW.entity_runtime_id
              AND json_extract(document, '$.current_position.runtime_cell_id')
                  = NEW.cell_runtime_id
        )
        BEGIN
            SELECT RAISE(ABORT, 'occupancy_invariant: insert does not match position');
        END;

        CREATE TRIGGER IF NOT EXISTS occupancy_update_guard
        BEFORE UPDATE ON occupancy_index
        BEGIN
            SELECT RAISE(ABORT, 'occupancy_invariant: entries are never updated in place');
        END;

        CREATE TRIGGER IF NOT EXISTS occupancy_delete_guard
        BEFORE DELETE ON occupancy_index
        WHEN EXISTS (
            SELECT 1 FROM runtime_states
            WHERE runtime_id = OLD.entity_runtime_id
              AND json_extract(document, '$.current_position.runtime_cell_id')
                  = OLD.cell_runtime_id
        )
        BEGIN
            SELECT RAISE(ABORT, 'occupancy_invariant: delete would orphan position');
        END;
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
         VALUES(?1, 'initial_v1', ?2)",
        rusqlite::params![SCHEMA_VERSION, super::timestamp()],
    )?;

    Ok(())
}
