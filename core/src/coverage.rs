//! Service coverage queries.
//!
//! A cell is covered by a service building when its Chebyshev distance to
//! that building is at most the building's range. Range is looked up per
//! subtype, not per category.
//!
//! Every query scans the whole grid. Results are the contract; a spatial
//! index may replace the scan as long as the answers stay identical.

use crate::{
    catalog::{BuildingCatalog, Category},
    grid::GridStore,
    types::{Cell, Tile},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub fn chebyshev(a: Cell, b: Cell) -> usize {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

/// Number of covering instances per service category at one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCoverage {
    pub kiosk:  usize,
    pub market: usize,
    pub office: usize,
}

pub struct CoverageIndex<'a> {
    grid:    &'a GridStore,
    catalog: &'a BuildingCatalog,
}

impl<'a> CoverageIndex<'a> {
    pub fn new(grid: &'a GridStore, catalog: &'a BuildingCatalog) -> Self {
        Self { grid, catalog }
    }

    /// How many placed `category` buildings cover (i, j).
    /// Non-service categories never cover anything.
    pub fn coverage_count(&self, category: Category, i: usize, j: usize) -> usize {
        self.count_with(category, i, j, |tile| self.catalog.range(tile))
    }

    pub fn is_covered(&self, category: Category, i: usize, j: usize) -> bool {
        self.coverage_count(category, i, j) > 0
    }

    /// Coverage count with a caller-supplied range per subtype.
    pub fn count_with<F>(&self, category: Category, i: usize, j: usize, range_of: F) -> usize
    where
        F: Fn(Tile) -> Option<u32>,
    {
        if !category.is_service() || !self.grid.in_bounds(i, j) {
            return 0;
        }
        self.grid
            .occupied()
            .filter(|&(_, _, tile)| self.catalog.category(tile) == category)
            .filter(|&(bi, bj, tile)| {
                range_of(tile).is_some_and(|r| chebyshev((bi, bj), (i, j)) <= r as usize)
            })
            .count()
    }

    pub fn summary(&self, i: usize, j: usize) -> CellCoverage {
        CellCoverage {
            kiosk:  self.coverage_count(Category::Kiosk, i, j),
            market: self.coverage_count(Category::Market, i, j),
            office: self.coverage_count(Category::Office, i, j),
        }
    }

    /// Every cell covered by at least one `category` building.
    pub fn covered_set(&self, category: Category) -> BTreeSet<Cell> {
        self.covered_set_with(category, |tile| self.catalog.range(tile))
    }

    pub fn covered_set_with<F>(&self, category: Category, range_of: F) -> BTreeSet<Cell>
    where
        F: Fn(Tile) -> Option<u32>,
    {
        self.grid
            .cells()
            .filter(|&(i, j, _)| self.count_with(category, i, j, &range_of) > 0)
            .map(|(i, j, _)| (i, j))
            .collect()
    }

    /// Cells served by the single service building at (i, j), clipped to
    /// the grid. Empty when (i, j) holds no service building.
    pub fn service_area(&self, i: usize, j: usize) -> Vec<Cell> {
        let Some(tile) = self.grid.get(i, j) else {
            return Vec::new();
        };
        if !self.catalog.category(tile).is_service() {
            return Vec::new();
        }
        let Some(range) = self.catalog.range(tile) else {
            return Vec::new();
        };
        let r = range as usize;
        let last = self.grid.size().saturating_sub(1);
        let mut cells = Vec::new();
        for ci in i.saturating_sub(r)..=(i + r).min(last) {
            for cj in j.saturating_sub(r)..=(j + r).min(last) {
                cells.push((ci, cj));
            }
        }
        cells
    }
}
