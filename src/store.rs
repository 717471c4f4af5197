use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

pub const KEY_CHAT_SESSIONS: &str = "chat_sessions";
pub const KEY_CURRENT_SESSION: &str = "current_session";
pub const KEY_TRANSLATED_FILES: &str = "translated_files";

/// SQLite-backed key-value store of JSON documents, standing in for the
/// browser `localStorage` the original front-end persisted to. Every value
/// is rewritten in full on each mutation; there is no schema versioning.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    pub fn new(app_dir: &Path) -> rusqlite::Result<Self> {
        std::fs::create_dir_all(app_dir).ok();
        let db_path = app_dir.join("ragdesk.db");
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Read and decode a value. Missing keys and undecodable JSON both come
    /// back as `None`; a decode failure is logged and treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .ok();
        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable stored value");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to encode value for storage");
                return;
            }
        };
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, json],
        ) {
            tracing::error!(key, error = %e, "failed to persist value");
        }
    }

    pub fn remove(&self, key: &str) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute("DELETE FROM kv WHERE key = ?1", params![key]) {
            tracing::error!(key, error = %e, "failed to remove stored value");
        }
    }
}
