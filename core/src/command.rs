use crate::{
    coords::TilePick,
    economy::MonthlyReport,
    event::CityEvent,
    interaction::Tool,
    persistence::SaveOutcome,
    types::Tile,
};
use serde::{Deserialize, Serialize};

/// All player-issued commands.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Map editing ───────────────────────────────
    Place { i: usize, j: usize, tile: Tile },
    Demolish { i: usize, j: usize },

    // ── Economy ───────────────────────────────────
    AdvanceMonth,
    Expand,
    GrantStars { stars: u32 },

    // ── Pointer and camera ────────────────────────
    SelectTool { tool: Tool },
    PointerMove { x: f64, y: f64 },
    PointerDown { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    Wheel { x: f64, y: f64, delta: f64 },

    // ── Persistence ───────────────────────────────
    PollSave,
    Flush,
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Applied { event: CityEvent },
    Month { report: MonthlyReport },
    Denied { reason: String },
    Hover { pick: TilePick },
    Zoom { scale: f64 },
    Save { outcome: SaveOutcome },
    Ok,
}
