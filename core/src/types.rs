//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};

/// Persistence partition key for a single player's city.
pub type MapKey = String;

/// The shared fallback map key used when no identity is available.
pub const DEFAULT_MAP_KEY: &str = "default";

/// Catalog index of a tile: `sprite_row * SHEET_COLS + sprite_col`.
pub type TileId = u16;

/// Columns in the sprite sheet. Fixes the tile-id encoding.
pub const SHEET_COLS: TileId = 12;

/// A sprite-sheet reference (row, col). `(0, 0)` is the empty sentinel.
///
/// Serialized as a two-element array so saved grids stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tile(pub u8, pub u8);

impl Tile {
    pub const EMPTY: Tile = Tile(0, 0);

    pub fn new(row: u8, col: u8) -> Self {
        Self(row, col)
    }

    pub fn row(self) -> u8 { self.0 }
    pub fn col(self) -> u8 { self.1 }

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    pub fn id(self) -> TileId {
        self.0 as TileId * SHEET_COLS + self.1 as TileId
    }
}

/// A grid cell address: row `i`, column `j`.
pub type Cell = (usize, usize);
