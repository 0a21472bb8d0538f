//! Store methods for the activity journal.

use super::CityStore;
use crate::{error::CityResult, event::EventLogEntry};
use rusqlite::params;

impl CityStore {
    pub fn append_event(&self, entry: &EventLogEntry) -> CityResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (map_key, recorded_at, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.map_key, entry.recorded_at, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_map(&self, map_key: &str) -> CityResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, map_key, recorded_at, event_type, payload
             FROM event_log WHERE map_key = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![map_key], |row| {
                Ok(EventLogEntry {
                    id:          Some(row.get(0)?),
                    map_key:     row.get(1)?,
                    recorded_at: row.get(2)?,
                    event_type:  row.get(3)?,
                    payload:     row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, map_key: &str, event_type: &str) -> CityResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE map_key = ?1 AND event_type = ?2",
            params![map_key, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(map_key: &str, event_type: &str, at: i64) -> EventLogEntry {
        EventLogEntry {
            id:          None,
            map_key:     map_key.into(),
            recorded_at: at,
            event_type:  event_type.into(),
            payload:     "{}".into(),
        }
    }

    #[test]
    fn events_are_partitioned_by_key_and_ordered() {
        let store = CityStore::in_memory_migrated().unwrap();
        store.append_event(&entry("a", "tile_placed", 1)).unwrap();
        store.append_event(&entry("b", "tile_placed", 2)).unwrap();
        store.append_event(&entry("a", "month_advanced", 3)).unwrap();

        let events = store.events_for_map("a").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].recorded_at, 1);
        assert_eq!(events[1].event_type, "month_advanced");
        assert!(events[0].id < events[1].id);
        assert_eq!(store.event_count("a", "tile_placed").unwrap(), 1);
        assert_eq!(store.event_count("c", "tile_placed").unwrap(), 0);
    }
}
