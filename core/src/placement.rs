//! Placement rules for roads and buildings.
//!
//! RULES:
//!   - Only the four orthogonal neighbours count, never diagonals.
//!   - Any road tile satisfies adjacency, whatever way its exits face.
//!   - The very first road on the map may go anywhere.
//!   - Buildings of every category need an orthogonally adjacent road.
//!   - The target cell must be empty; that is checked before either rule.

use crate::{
    catalog::{BuildingCatalog, Category},
    error::Denied,
    grid::GridStore,
    types::Tile,
};

pub struct PlacementValidator<'a> {
    grid:    &'a GridStore,
    catalog: &'a BuildingCatalog,
}

impl<'a> PlacementValidator<'a> {
    pub fn new(grid: &'a GridStore, catalog: &'a BuildingCatalog) -> Self {
        Self { grid, catalog }
    }

    pub fn is_road(&self, i: usize, j: usize) -> bool {
        self.grid.get(i, j).is_some_and(|t| self.catalog.is_road(t))
    }

    pub fn any_road(&self) -> bool {
        self.grid.occupied().any(|(_, _, t)| self.catalog.is_road(t))
    }

    fn has_adjacent_road(&self, i: usize, j: usize) -> bool {
        let (neighbours, count) = self.grid.neighbours4(i, j);
        neighbours[..count].iter().any(|&(ni, nj)| self.is_road(ni, nj))
    }

    /// Road rule. Does not look at the target cell's own content.
    pub fn can_place_road(&self, i: usize, j: usize) -> Result<(), Denied> {
        if !self.grid.in_bounds(i, j) {
            return Err(Denied::OutOfBounds);
        }
        if !self.any_road() || self.has_adjacent_road(i, j) {
            Ok(())
        } else {
            Err(Denied::NeedsAdjacentRoad)
        }
    }

    /// Building rule. Does not look at the target cell's own content.
    pub fn can_place_building(&self, i: usize, j: usize) -> Result<(), Denied> {
        if !self.grid.in_bounds(i, j) {
            return Err(Denied::OutOfBounds);
        }
        if self.has_adjacent_road(i, j) {
            Ok(())
        } else {
            Err(Denied::NeedsAdjacentRoad)
        }
    }

    /// Full legality check for putting `tile` at (i, j): bounds, known tile,
    /// empty target, then the category's adjacency rule. Funds are the
    /// caller's concern.
    pub fn check(&self, tile: Tile, i: usize, j: usize) -> Result<(), Denied> {
        if !self.grid.in_bounds(i, j) {
            return Err(Denied::OutOfBounds);
        }
        let category = self.catalog.category(tile);
        if category == Category::Empty {
            return Err(Denied::UnknownTile);
        }
        if !self.grid.is_empty(i, j) {
            return Err(Denied::FieldOccupied);
        }
        match category {
            Category::Road => self.can_place_road(i, j),
            _ => self.can_place_building(i, j),
        }
    }
}
