//! SQLite-backed store shared by every runtime service.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::repository::{RepositoryError, Result, schema};

/// One SQLite connection guarded by a mutex.
///
/// Reads run directly on the connection. Writes run inside an `IMMEDIATE`
/// transaction, so the database write lock is taken at `BEGIN` and writers
/// from other connections queue behind it (up to the busy timeout).
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and applies the schema.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        schema::configure(&conn, busy_timeout)?;
        schema::migrate(&conn)?;
        tracing::debug!(path = %path.display(), "opened world store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database, mostly for tests and tools.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::configure(&conn, Duration::ZERO)?;
        schema::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs `f` against the connection without a transaction.
    pub fn read<T, E>(
        &self,
        f: impl FnOnce(&Connection) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let conn = self.conn.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside an `IMMEDIATE` transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls everything back.
    pub fn write<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let mut conn = self.conn.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let value = f(&tx)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok(value)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_write_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();

        let result: std::result::Result<(), RepositoryError> = store.write(|tx| {
            tx.execute(
                "INSERT INTO sessions (session_id, status, created_at) VALUES ('s1', 'active', 'now')",
                [],
            )?;
            Err(RepositoryError::CorruptedData("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .read(|conn| {
                conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                    .map_err(RepositoryError::from)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.db");

        {
            let store = SqliteStore::open(&path, Duration::from_millis(100)).unwrap();
            store
                .write(|tx| {
                    tx.execute(
                        "INSERT INTO sessions (session_id, status, created_at) VALUES ('s1', 'active', 'now')",
                        [],
                    )
                    .map_err(RepositoryError::from)
                })
                .unwrap();
        }

        let store = SqliteStore::open(&path, Duration::from_millis(100)).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        let count: i64 = store
            .read(|conn| {
                conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                    .map_err(RepositoryError::from)
            })
            .unwrap();
        assert_eq!(count, 1);
    }
}
