//! Activity journal: one event per applied mutation.
//!
//! Events are returned to the caller and appended to the local
//! `event_log` table. Refused actions never produce an event.

use crate::{catalog::Category, types::{MapKey, Tile}};
use serde::{Deserialize, Serialize};

/// Every event emitted by the engine.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CityEvent {
    MapLoaded {
        map_key: MapKey,
        source:  String,
        n:       usize,
    },
    TilePlaced {
        i:        usize,
        j:        usize,
        tile:     Tile,
        category: Category,
        price:    i64,
        balance:  i64,
    },
    TileDemolished {
        i:    usize,
        j:    usize,
        tile: Tile,
    },
    MonthAdvanced {
        total_tax:   i64,
        population:  i64,
        new_balance: i64,
        stars_left:  u32,
    },
    GridExpanded {
        new_n:   usize,
        cost:    i64,
        balance: i64,
    },
    StarsGranted {
        granted: u32,
        stars:   u32,
    },
}

impl CityEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MapLoaded { .. }      => "map_loaded",
            Self::TilePlaced { .. }     => "tile_placed",
            Self::TileDemolished { .. } => "tile_demolished",
            Self::MonthAdvanced { .. }  => "month_advanced",
            Self::GridExpanded { .. }   => "grid_expanded",
            Self::StarsGranted { .. }   => "stars_granted",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:          Option<i64>,
    pub map_key:     MapKey,
    pub recorded_at: i64, // unix millis
    pub event_type:  String,
    pub payload:     String, // JSON-serialized CityEvent
}
