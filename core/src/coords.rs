//! Isometric projection, camera transform and tile hit testing.
//!
//! Grid space:  (i, j) = (row, col), shifted by the ring offset (off_i, off_j).
//! Local space: pixels relative to the grid origin, before pan and zoom.
//! Screen space: canvas pixels, `origin + pan + local * scale`.

use crate::config::ViewConfig;
use serde::{Deserialize, Serialize};

/// Fractional grid coordinates are clamped to this magnitude before the
/// integer cast. Far beyond any reachable grid size.
const PICK_LIMIT: f64 = 1.0e9;

/// Result of mapping a pointer position to a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePick {
    /// Picked cell, clamped into the grid.
    pub i: usize,
    pub j: usize,
    /// Whether the unclamped pick was inside the grid. Placement must be
    /// refused when this is false.
    pub in_bounds: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub iso_w:  f64,
    pub iso_h:  f64,
    /// Ring-shift offset applied to grid indices.
    pub off_i:  i64,
    pub off_j:  i64,
    /// Pixel offset of the grid inside local space.
    pub off_x:  f64,
    pub off_y:  f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub pan_x:  f64,
    pub pan_y:  f64,
    pub scale:  f64,
    min_scale:      f64,
    max_scale:      f64,
    zoom_out_ratio: f64,
    zoom_in_ratio:  f64,
}

impl CoordinateSystem {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            iso_w:    config.iso_tile_width,
            iso_h:    config.iso_tile_height,
            off_i:    0,
            off_j:    0,
            off_x:    config.offset_x,
            off_y:    config.offset_y,
            origin_x: config.origin_x,
            origin_y: config.origin_y,
            pan_x:    0.0,
            pan_y:    0.0,
            scale:    1.0_f64.clamp(config.min_scale, config.max_scale),
            min_scale:      config.min_scale,
            max_scale:      config.max_scale,
            zoom_out_ratio: config.zoom_out_ratio,
            zoom_in_ratio:  config.zoom_in_ratio,
        }
    }

    /// Local-space centre of a cell. Accepts indices outside the grid.
    pub fn tile_center(&self, i: i64, j: i64) -> (f64, f64) {
        let row = (i + self.off_i) as f64;
        let col = (j + self.off_j) as f64;
        let x = ((col - row) * self.iso_w) / 2.0 + self.off_x;
        let y = ((row + col) * self.iso_h) / 2.0 + self.off_y;
        (x, y)
    }

    /// Local space to screen space.
    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.origin_x + self.pan_x + x * self.scale,
            self.origin_y + self.pan_y + y * self.scale,
        )
    }

    /// Screen space to local space.
    pub fn to_local(&self, px: f64, py: f64) -> (f64, f64) {
        (
            (px - self.origin_x - self.pan_x) / self.scale,
            (py - self.origin_y - self.pan_y) / self.scale,
        )
    }

    /// Screen-space centre of a grid cell.
    pub fn cell_to_screen(&self, i: usize, j: usize) -> (f64, f64) {
        let (x, y) = self.tile_center(i as i64, j as i64);
        self.to_screen(x, y)
    }

    /// Continuous grid coordinates under a screen point.
    /// Integer values land on cell centres.
    pub fn fractional_cell(&self, px: f64, py: f64) -> (f64, f64) {
        let (lx, ly) = self.to_local(px, py);
        let x = lx - self.off_x;
        let y = ly - self.off_y;
        let i = y / self.iso_h - x / self.iso_w - self.off_i as f64;
        let j = y / self.iso_h + x / self.iso_w - self.off_j as f64;
        (i, j)
    }

    /// Nearest tile under a screen point on an `n`×`n` grid.
    ///
    /// Flooring the continuous coordinates alone picks the wrong diamond
    /// near cell edges, so the 2×2 floor neighbourhood is scored by
    /// diamond distance to each candidate centre and the closest wins.
    pub fn pick(&self, px: f64, py: f64, n: usize) -> TilePick {
        let (fi, fj) = self.fractional_cell(px, py);
        if !(fi.is_finite() && fj.is_finite()) {
            return TilePick { i: 0, j: 0, in_bounds: false };
        }
        let fi = fi.clamp(-PICK_LIMIT, PICK_LIMIT);
        let fj = fj.clamp(-PICK_LIMIT, PICK_LIMIT);
        let (bi, bj) = (fi.floor() as i64, fj.floor() as i64);
        let (lx, ly) = self.to_local(px, py);

        let candidates = [(bi, bj), (bi + 1, bj), (bi, bj + 1), (bi + 1, bj + 1)];
        let (ri, rj) = candidates
            .into_iter()
            .min_by(|a, b| {
                let da = self.diamond_distance(lx, ly, a.0, a.1);
                let db = self.diamond_distance(lx, ly, b.0, b.1);
                da.total_cmp(&db)
            })
            .unwrap_or((bi, bj));

        let limit = n as i64;
        let in_bounds = (0..limit).contains(&ri) && (0..limit).contains(&rj);
        let max = limit.saturating_sub(1).max(0);
        TilePick {
            i: ri.clamp(0, max) as usize,
            j: rj.clamp(0, max) as usize,
            in_bounds,
        }
    }

    /// Distance in diamond units: 1.0 on the edge of the cell's diamond.
    fn diamond_distance(&self, x: f64, y: f64, i: i64, j: i64) -> f64 {
        let (cx, cy) = self.tile_center(i, j);
        (x - cx).abs() / (self.iso_w / 2.0) + (y - cy).abs() / (self.iso_h / 2.0)
    }

    /// Zoom by one wheel notch around a screen point.
    ///
    /// Positive `delta` zooms out, negative zooms in. The local point under
    /// the pointer stays under the pointer. Returns the new scale.
    pub fn zoom_at(&mut self, px: f64, py: f64, delta: f64) -> f64 {
        let old = self.scale;
        let ratio = if delta > 0.0 {
            self.zoom_out_ratio
        } else if delta < 0.0 {
            self.zoom_in_ratio
        } else {
            return old;
        };
        let new = (old * ratio).clamp(self.min_scale, self.max_scale);

        let pointer_x = px - self.origin_x - self.pan_x;
        let pointer_y = py - self.origin_y - self.pan_y;
        self.pan_x -= (pointer_x / old) * (new - old);
        self.pan_y -= (pointer_y / old) * (new - old);
        self.scale = new;
        new
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Keep the city visually in place after the grid grew by one ring:
    /// old (i, j) is now (i + 1, j + 1).
    pub fn shift_for_ring(&mut self) {
        self.off_i -= 1;
        self.off_j -= 1;
    }
}
