//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The gateway and engine call store methods; they never execute SQL.

use crate::error::CityResult;
use rusqlite::Connection;

mod events;
mod local;
mod maps;

pub use maps::StoredMap;

pub struct CityStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl CityStore {
    pub fn open(path: &str) -> CityResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn, path: Some(path.to_string()) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CityResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Open and migrate in one step.
    pub fn open_migrated(path: &str) -> CityResult<Self> {
        let store = Self::open(path)?;
        store.migrate()?;
        Ok(store)
    }

    pub fn in_memory_migrated() -> CityResult<Self> {
        let store = Self::in_memory()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CityResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_map_save.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_local_snapshot.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_event_log.sql"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let store = CityStore::in_memory_migrated().unwrap();
        store.migrate().unwrap();
        assert!(store.path().is_none());
    }
}
