//! Pointer interaction state and transient player notices.
//!
//! The engine owns exactly one [`InteractionState`]; input handlers go
//! through it instead of keeping their own hover/drag/tool variables.

use crate::{coords::TilePick, types::Tile};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Pointer travel (screen pixels) after which a press becomes a pan.
pub const DRAG_THRESHOLD_PX: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Inspect,
    Place { tile: Tile },
    Demolish,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub start_x: f64,
    pub start_y: f64,
    pub last_x:  f64,
    pub last_y:  f64,
    /// Set once the pointer travelled past the drag threshold.
    pub panning: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    pub tool:  Tool,
    pub hover: Option<TilePick>,
    pub drag:  Option<DragState>,
}

impl InteractionState {
    pub fn begin_drag(&mut self, px: f64, py: f64) {
        self.drag = Some(DragState { start_x: px, start_y: py, last_x: px, last_y: py, panning: false });
    }

    /// Advance an active drag. Returns the pan delta to apply, if any.
    pub fn drag_to(&mut self, px: f64, py: f64) -> Option<(f64, f64)> {
        let drag = self.drag.as_mut()?;
        if !drag.panning {
            let travelled = (px - drag.start_x).hypot(py - drag.start_y);
            if travelled < DRAG_THRESHOLD_PX {
                return None;
            }
            drag.panning = true;
        }
        let delta = (px - drag.last_x, py - drag.last_y);
        drag.last_x = px;
        drag.last_y = py;
        Some(delta)
    }

    /// Finish a drag. Returns true when the press never turned into a pan,
    /// i.e. it should be treated as a click.
    pub fn end_drag(&mut self) -> bool {
        self.drag.take().is_some_and(|d| !d.panning)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

/// Short-lived, auto-dismissing player notices.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl:     Duration,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, notices: Vec::new() }
    }

    pub fn push(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.prune(now);
        self.notices.push(Notice { message: message.into(), expires_at: now + self.ttl });
    }

    /// Drop expired notices and return the rest, oldest first.
    pub fn active(&mut self, now: DateTime<Utc>) -> &[Notice] {
        self.prune(now);
        &self.notices
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        self.notices.retain(|n| n.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_press_is_a_click() {
        let mut state = InteractionState::default();
        state.begin_drag(100.0, 100.0);
        assert_eq!(state.drag_to(102.0, 101.0), None);
        assert!(state.end_drag());
        assert!(state.drag.is_none());
    }

    #[test]
    fn long_drag_pans_and_is_not_a_click() {
        let mut state = InteractionState::default();
        state.begin_drag(100.0, 100.0);
        assert_eq!(state.drag_to(110.0, 100.0), Some((10.0, 0.0)));
        assert_eq!(state.drag_to(112.0, 95.0), Some((2.0, -5.0)));
        assert!(!state.end_drag());
    }

    #[test]
    fn no_drag_no_click() {
        let mut state = InteractionState::default();
        assert_eq!(state.drag_to(1.0, 1.0), None);
        assert!(!state.end_drag());
    }

    #[test]
    fn notices_expire() {
        let t0 = DateTime::<Utc>::default();
        let mut board = NoticeBoard::new(Duration::milliseconds(2_500));
        board.push("Field occupied", t0);
        board.push("Needs adjacent road", t0 + Duration::milliseconds(1_000));

        assert_eq!(board.active(t0 + Duration::milliseconds(2_000)).len(), 2);
        let left = board.active(t0 + Duration::milliseconds(2_500));
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "Needs adjacent road");
        assert!(board.active(t0 + Duration::milliseconds(3_500)).is_empty());
    }
}
