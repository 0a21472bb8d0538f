//! The square tile matrix.
//!
//! RULE: The grid is always N×N and only ever grows, one ring at a time.
//! Every accessor is bounds-checked; out-of-range cells are never touched.

use crate::{
    error::{CityError, CityResult},
    types::{Cell, Tile},
};

/// Largest edge length a grid may reach, by expansion or by loading.
pub const MAX_GRID_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStore {
    n:     usize,
    cells: Vec<Tile>, // row-major, n * n
}

impl GridStore {
    /// An `n`×`n` grid of empty tiles.
    pub fn new(n: usize) -> Self {
        Self { n, cells: vec![Tile::EMPTY; n * n] }
    }

    /// Build from nested rows. Returns `None` unless the rows form a square.
    pub fn from_rows(rows: &[Vec<Tile>]) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Some(Self { n, cells: rows.iter().flatten().copied().collect() })
    }

    pub fn to_rows(&self) -> Vec<Vec<Tile>> {
        self.cells.chunks(self.n.max(1)).take(self.n).map(|r| r.to_vec()).collect()
    }

    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.n && j < self.n
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        i * self.n + j
    }

    pub fn get(&self, i: usize, j: usize) -> Option<Tile> {
        self.in_bounds(i, j).then(|| self.cells[self.index(i, j)])
    }

    /// Store `tile` at (i, j) and return what was there before.
    pub fn set(&mut self, i: usize, j: usize, tile: Tile) -> CityResult<Tile> {
        if !self.in_bounds(i, j) {
            return Err(CityError::OutOfBounds { i, j, n: self.n });
        }
        let idx = self.index(i, j);
        Ok(std::mem::replace(&mut self.cells[idx], tile))
    }

    /// True iff (i, j) is inside the grid and holds the empty sentinel.
    pub fn is_empty(&self, i: usize, j: usize) -> bool {
        self.get(i, j).is_some_and(Tile::is_empty)
    }

    /// Up to 4 orthogonal neighbours and the count of valid entries.
    /// Use `&result[..count]` to iterate over valid neighbours.
    pub fn neighbours4(&self, i: usize, j: usize) -> ([Cell; 4], usize) {
        let mut result = [(0, 0); 4];
        let mut count = 0;
        if !self.in_bounds(i, j) {
            return (result, 0);
        }
        if i > 0 {
            result[count] = (i - 1, j);
            count += 1;
        }
        if i + 1 < self.n {
            result[count] = (i + 1, j);
            count += 1;
        }
        if j > 0 {
            result[count] = (i, j - 1);
            count += 1;
        }
        if j + 1 < self.n {
            result[count] = (i, j + 1);
            count += 1;
        }
        (result, count)
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        let n = self.n;
        self.cells.iter().enumerate().map(move |(k, t)| (k / n, k % n, *t))
    }

    /// Every non-empty cell in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        self.cells().filter(|(_, _, t)| !t.is_empty())
    }

    /// Grow by one empty ring. Old (i, j) moves to (i + 1, j + 1).
    pub fn expand_ring(&mut self) {
        let old_n = self.n;
        let new_n = old_n + 2;
        let mut cells = vec![Tile::EMPTY; new_n * new_n];
        for i in 0..old_n {
            let src = &self.cells[i * old_n..(i + 1) * old_n];
            let start = (i + 1) * new_n + 1;
            cells[start..start + old_n].copy_from_slice(src);
        }
        self.n = new_n;
        self.cells = cells;
        log::debug!("grid expanded {old_n}x{old_n} -> {new_n}x{new_n}");
    }

    /// Replace the content with the overlapping top-left region of a grid
    /// stored at a different dimension. Cells outside the overlap become
    /// empty. Ragged or short source rows read as empty; never fails.
    pub fn reproject_from(&mut self, source_n: usize, source: &[Vec<Tile>]) {
        let overlap = self.n.min(source_n);
        self.cells.fill(Tile::EMPTY);
        for i in 0..overlap {
            for j in 0..overlap {
                let tile = source
                    .get(i)
                    .and_then(|row| row.get(j))
                    .copied()
                    .unwrap_or(Tile::EMPTY);
                let idx = self.index(i, j);
                self.cells[idx] = tile;
            }
        }
        log::debug!(
            "reprojected {source_n}x{source_n} source onto {n}x{n} grid ({overlap}x{overlap} copied)",
            n = self.n
        );
    }
}
