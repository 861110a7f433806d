//! SQLite-backed history store.
//!
//! Each session is one row; the full history is kept as a JSON document
//! in the `data` column.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::HistoryStore;
use crate::error::{Error, Result};
use crate::types::PromptHistory;

const HISTORY_TABLES_SQL: &str = include_str!("migrations/001_history_tables.sql");

/// History store persisted to a SQLite database.
///
/// Thread-safe via internal Mutex. All operations acquire the lock.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        debug!("Opened history database at {}", path.display());

        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(HISTORY_TABLES_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn save(&self, history: &PromptHistory) -> Result<()> {
        let data = serde_json::to_string(history)?;
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;

        conn.execute(
            "INSERT INTO prompt_history (id, created_at, completed_at, data)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                completed_at = excluded.completed_at,
                data = excluded.data",
            params![
                history.id,
                history.created_at.to_rfc3339(),
                history.completed_at.map(|t| t.to_rfc3339()),
                data,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PromptHistory>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;

        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM prompt_history WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;

        let mut stmt = conn.prepare("SELECT id FROM prompt_history ORDER BY created_at, id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM prompt_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
