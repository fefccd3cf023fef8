//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine hands over whole records; a save replaces the previous
//! record for that key in a single statement, so a crash can never
//! leave a half-written record behind.

use crate::{error::LivesResult, state::SaveRecord};
use rusqlite::{params, Connection, OptionalExtension};

/// Key/value save backend. Implementations must replace records
/// wholesale, never field by field.
pub trait SaveBackend: Send {
    fn load(&self, key: &str) -> LivesResult<Option<SaveRecord>>;
    fn save(&self, key: &str, record: &SaveRecord) -> LivesResult<()>;
}

pub struct SaveStore {
    conn: Connection,
}

impl SaveStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> LivesResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LivesResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LivesResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_save_data.sql"))?;
        Ok(())
    }

    /// Number of stored records (for tests and tooling).
    pub fn record_count(&self) -> LivesResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM save_data", [], |row| row.get(0))?;
        Ok(count)
    }

    /// When `key` was last saved, if ever.
    pub fn saved_at(&self, key: &str) -> LivesResult<Option<String>> {
        let saved_at = self
            .conn
            .query_row(
                "SELECT saved_at FROM save_data WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(saved_at)
    }

    /// Remove every record. Models a full save-data wipe.
    pub fn wipe(&self) -> LivesResult<()> {
        self.conn.execute("DELETE FROM save_data", [])?;
        Ok(())
    }
}

impl SaveBackend for SaveStore {
    fn load(&self, key: &str) -> LivesResult<Option<SaveRecord>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM save_data WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, record: &SaveRecord) -> LivesResult<()> {
        let payload = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO save_data (key, payload, saved_at) VALUES (?1, ?2, ?3)",
            params![key, payload, chrono::Utc::now().to_rfc3339()],
        )?;
        log::trace!("save_data[{key}] written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SaveStore {
        let store = SaveStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        store
    }

    #[test]
    fn missing_key_loads_as_none() {
        assert!(store().load("lives").unwrap().is_none());
    }

    #[test]
    fn save_replaces_whole_record() {
        let store = store();

        let mut first = SaveRecord::new();
        first.insert("count".into(), json!(3));
        first.insert("legacy".into(), json!(true));
        store.save("lives", &first).unwrap();

        let mut second = SaveRecord::new();
        second.insert("count".into(), json!(1));
        store.save("lives", &second).unwrap();

        let loaded = store.load("lives").unwrap().unwrap();
        assert_eq!(loaded, second);
        assert_eq!(store.record_count().unwrap(), 1);
        assert!(store.saved_at("lives").unwrap().is_some());
    }

    #[test]
    fn migrate_is_repeatable() {
        let store = store();
        store.migrate().unwrap();
        store.wipe().unwrap();
        assert_eq!(store.record_count().unwrap(), 0);
    }
}
