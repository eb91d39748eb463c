//! Tab-scoped key/value storage
//!
//! Every record lives under a `scope` (the browser tab id) and a `key`, so two
//! tabs never see each other's session.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, AppResult};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, scope: &str, key: &str) -> AppResult<Option<String>>;
    fn set(&self, scope: &str, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, scope: &str, key: &str) -> AppResult<()>;
    /// Mark every record of `scope` as used now
    fn touch(&self, scope: &str) -> AppResult<()>;
    /// Drop records not written or touched since `cutoff`
    fn purge_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize>;
}

/// Fixed-width UTC timestamps so SQLite can compare them as text
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============ In-memory ============

/// (scope, key) -> (value, last write or touch)
type Entries = HashMap<(String, String), (String, DateTime<Utc>)>;

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Custom("Storage lock error".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: &str, key: &str) -> AppResult<Option<String>> {
        let entries = self.lock()?;
        Ok(entries
            .get(&(scope.to_string(), key.to_string()))
            .map(|(value, _)| value.clone()))
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.lock()?;
        entries.insert((scope.to_string(), key.to_string()), (value.to_string(), Utc::now()));
        Ok(())
    }

    fn remove(&self, scope: &str, key: &str) -> AppResult<()> {
        let mut entries = self.lock()?;
        entries.remove(&(scope.to_string(), key.to_string()));
        Ok(())
    }

    fn touch(&self, scope: &str) -> AppResult<()> {
        let mut entries = self.lock()?;
        let now = Utc::now();
        for ((entry_scope, _), (_, updated_at)) in entries.iter_mut() {
            if entry_scope == scope {
                *updated_at = now;
            }
        }
        Ok(())
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, (_, updated_at)| *updated_at >= cutoff);
        Ok(before - entries.len())
    }
}

// ============ SQLite ============

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> AppResult<Self> {
        log::info!("[Storage] opening {:?}", path);
        let conn = Connection::open(path)?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get_conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Custom("Database lock error".to_string()))
    }
}

fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tab_storage (
            scope TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (scope, key)
        );",
    )?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, scope: &str, key: &str) -> AppResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM tab_storage WHERE scope = ?1 AND key = ?2",
            params![scope, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> AppResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO tab_storage (scope, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![scope, key, value, stamp(Utc::now())],
        )?;
        Ok(())
    }

    fn remove(&self, scope: &str, key: &str) -> AppResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM tab_storage WHERE scope = ?1 AND key = ?2",
            params![scope, key],
        )?;
        Ok(())
    }

    fn touch(&self, scope: &str) -> AppResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE tab_storage SET updated_at = ?1 WHERE scope = ?2",
            params![stamp(Utc::now()), scope],
        )?;
        Ok(())
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let conn = self.get_conn()?;
        let purged = conn.execute(
            "DELETE FROM tab_storage WHERE updated_at < ?1",
            params![stamp(cutoff)],
        )?;
        if purged > 0 {
            log::info!("[Storage] purged {} stale records", purged);
        }
        Ok(purged)
    }
}
