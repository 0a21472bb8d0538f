//! Store methods for local fallback snapshots.

use super::CityStore;
use crate::error::CityResult;
use rusqlite::{params, OptionalExtension};

/// Snapshots kept per map key; older rows are pruned on write.
pub const LOCAL_SNAPSHOTS_KEPT: i64 = 5;

impl CityStore {
    pub fn insert_local_snapshot(
        &self,
        map_key:       &str,
        payload:       &str,
        last_modified: i64,
        written_at:    i64,
    ) -> CityResult<()> {
        self.conn.execute(
            "INSERT INTO local_snapshot (map_key, payload, last_modified, written_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![map_key, payload, last_modified, written_at],
        )?;
        self.conn.execute(
            "DELETE FROM local_snapshot
             WHERE map_key = ?1 AND id NOT IN (
                SELECT id FROM local_snapshot WHERE map_key = ?1
                ORDER BY id DESC LIMIT ?2
             )",
            params![map_key, LOCAL_SNAPSHOTS_KEPT],
        )?;
        Ok(())
    }

    /// Payload of the most recently written snapshot for `map_key`.
    pub fn latest_local_snapshot(&self, map_key: &str) -> CityResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM local_snapshot
                 WHERE map_key = ?1
                 ORDER BY id DESC LIMIT 1",
                params![map_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    pub fn local_snapshot_count(&self, map_key: &str) -> CityResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM local_snapshot WHERE map_key = ?1",
            params![map_key],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::LOCAL_SNAPSHOTS_KEPT;
    use crate::store::CityStore;

    #[test]
    fn newest_wins_and_old_rows_are_pruned() {
        let store = CityStore::in_memory_migrated().unwrap();
        for k in 0..8 {
            store.insert_local_snapshot("k", &format!("{k}"), k, k).unwrap();
        }
        store.insert_local_snapshot("other", "x", 0, 0).unwrap();

        assert_eq!(store.latest_local_snapshot("k").unwrap().as_deref(), Some("7"));
        assert_eq!(store.local_snapshot_count("k").unwrap(), LOCAL_SNAPSHOTS_KEPT);
        assert_eq!(store.local_snapshot_count("other").unwrap(), 1);
        assert!(store.latest_local_snapshot("none").unwrap().is_none());
    }
}
