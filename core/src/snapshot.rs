//! Save payloads: the full city state addressed by a map key.
//!
//! The same JSON shape is used for the remote service and for local
//! fallback snapshots. Field names follow the remote wire contract.

use crate::{
    economy::EconomyState,
    grid::{GridStore, MAX_GRID_SIZE},
    types::{MapKey, Tile},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnapshot {
    pub n:       usize,
    pub grid:    Vec<Vec<Tile>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
    pub balance: i64,
    pub stars:   u32,
}

/// A save addressed to one map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub map_key: MapKey,
    #[serde(flatten)]
    pub snapshot: SaveSnapshot,
}

/// A snapshot turned back into live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredCity {
    pub grid:        GridStore,
    pub economy:     EconomyState,
    /// True when the stored matrix did not match the target dimension.
    pub reprojected: bool,
}

impl SaveSnapshot {
    pub fn capture(grid: &GridStore, economy: &EconomyState) -> Self {
        Self {
            n:             grid.size(),
            grid:          grid.to_rows(),
            last_modified: economy.last_modified,
            balance:       economy.balance,
            stars:         economy.stars,
        }
    }

    /// The dimension this snapshot should be restored at: the declared `n`,
    /// never below `base`, kept on the even step from `base`.
    ///
    /// A declared `n` above [`MAX_GRID_SIZE`] is not trusted; the stored
    /// matrix length stands in for it, capped the same way.
    pub fn target_size(&self, base: usize) -> usize {
        let declared = if self.n > MAX_GRID_SIZE { self.grid.len() } else { self.n };
        let n = declared.min(MAX_GRID_SIZE).max(base);
        n + (n - base) % 2
    }

    /// Rebuild live state. The stored matrix is reprojected only when it
    /// is not already a square of the target dimension.
    pub fn restore(&self, base: usize) -> RestoredCity {
        let target = self.target_size(base);
        if self.n > MAX_GRID_SIZE {
            log::warn!("stored n={} exceeds {MAX_GRID_SIZE}; restoring at {target}", self.n);
        }
        let economy = EconomyState::new(self.balance, self.stars, self.last_modified);

        match GridStore::from_rows(&self.grid) {
            Some(grid) if grid.size() == target => RestoredCity { grid, economy, reprojected: false },
            _ => {
                let mut grid = GridStore::new(target);
                grid.reproject_from(self.grid.len(), &self.grid);
                log::warn!(
                    "stored grid has {} rows but n={} (target {target}); reprojected",
                    self.grid.len(),
                    self.n
                );
                RestoredCity { grid, economy, reprojected: true }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn wire_shape_is_camel_case_with_millis() {
        let mut grid = GridStore::new(2);
        grid.set(0, 1, Tile(1, 0)).unwrap();
        let economy = EconomyState::new(750, 2, ts(1_700_000_000_123));
        let request = SaveRequest {
            map_key:  "user-7".into(),
            snapshot: SaveSnapshot::capture(&grid, &economy),
        };

        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mapKey": "user-7",
                "n": 2,
                "grid": [[[0, 0], [1, 0]], [[0, 0], [0, 0]]],
                "lastModified": 1_700_000_000_123i64,
                "balance": 750,
                "stars": 2
            })
        );
    }

    #[test]
    fn matching_dimension_restores_without_reprojection() {
        let mut grid = GridStore::new(18);
        grid.set(17, 17, Tile(0, 1)).unwrap();
        let economy = EconomyState::new(1, 0, ts(5));
        let restored = SaveSnapshot::capture(&grid, &economy).restore(16);
        assert!(!restored.reprojected);
        assert_eq!(restored.grid, grid);
        assert_eq!(restored.economy, economy);
    }

    #[test]
    fn mismatched_matrix_is_reprojected() {
        let mut small = GridStore::new(16);
        small.set(3, 4, Tile(1, 0)).unwrap();
        let mut snapshot = SaveSnapshot::capture(&small, &EconomyState::new(0, 0, ts(0)));
        snapshot.n = 18;

        let restored = snapshot.restore(16);
        assert!(restored.reprojected);
        assert_eq!(restored.grid.size(), 18);
        assert_eq!(restored.grid.get(3, 4), Some(Tile(1, 0)));
    }

    #[test]
    fn target_size_stays_on_even_steps() {
        let snap = |n| SaveSnapshot { n, grid: vec![], last_modified: ts(0), balance: 0, stars: 0 };
        assert_eq!(snap(0).target_size(16), 16);
        assert_eq!(snap(16).target_size(16), 16);
        assert_eq!(snap(19).target_size(16), 20);
        assert_eq!(snap(22).target_size(16), 22);
    }

    #[test]
    fn absurd_declared_size_falls_back_to_stored_rows() {
        let mut grid = GridStore::new(18);
        grid.set(2, 2, Tile(0, 1)).unwrap();
        let economy = EconomyState::new(9, 1, ts(0));

        for n in [usize::MAX, 1 << 33, 100_000, MAX_GRID_SIZE + 1] {
            let mut snapshot = SaveSnapshot::capture(&grid, &economy);
            snapshot.n = n;
            assert_eq!(snapshot.target_size(16), 18);
            let restored = snapshot.restore(16);
            assert_eq!(restored.grid, grid);
            assert_eq!(restored.economy, economy);
        }

        let empty = SaveSnapshot { n: usize::MAX, grid: vec![], last_modified: ts(0), balance: 0, stars: 0 };
        assert_eq!(empty.restore(16).grid, GridStore::new(16));
    }

    #[test]
    fn declared_size_is_capped() {
        let mut snapshot = SaveSnapshot::capture(&GridStore::new(16), &EconomyState::new(0, 0, ts(0)));
        snapshot.n = MAX_GRID_SIZE;
        assert_eq!(snapshot.target_size(16), MAX_GRID_SIZE);
        snapshot.grid = vec![vec![Tile::EMPTY; 3]; MAX_GRID_SIZE + 7];
        snapshot.n = MAX_GRID_SIZE + 7;
        assert_eq!(snapshot.target_size(16), MAX_GRID_SIZE);
    }
}
