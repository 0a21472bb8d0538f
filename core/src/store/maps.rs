//! Store methods for the remote map table (`map_save`).

use super::CityStore;
use crate::error::CityResult;
use rusqlite::{params, OptionalExtension};

/// A row of `map_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMap {
    pub map_key:       String,
    pub n:             i64,
    pub payload:       String,
    pub last_modified: i64,
    pub saved_at:      i64,
}

impl CityStore {
    /// Insert or overwrite the save for `map_key`. Last writer wins.
    pub fn upsert_map(
        &self,
        map_key:       &str,
        n:             usize,
        payload:       &str,
        last_modified: i64,
        saved_at:      i64,
    ) -> CityResult<()> {
        self.conn.execute(
            "INSERT INTO map_save (map_key, n, payload, last_modified, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(map_key) DO UPDATE SET
                n = excluded.n,
                payload = excluded.payload,
                last_modified = excluded.last_modified,
                saved_at = excluded.saved_at",
            params![map_key, n as i64, payload, last_modified, saved_at],
        )?;
        Ok(())
    }

    pub fn map(&self, map_key: &str) -> CityResult<Option<StoredMap>> {
        let row = self
            .conn
            .query_row(
                "SELECT map_key, n, payload, last_modified, saved_at
                 FROM map_save WHERE map_key = ?1",
                params![map_key],
                |row| {
                    Ok(StoredMap {
                        map_key:       row.get(0)?,
                        n:             row.get(1)?,
                        payload:       row.get(2)?,
                        last_modified: row.get(3)?,
                        saved_at:      row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn map_count(&self) -> CityResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM map_save", [], |row| row.get(0))?;
        Ok(count)
    }
}
