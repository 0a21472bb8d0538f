//! Read-only views of the model for drawing and diagnostics.
//!
//! RULE: Nothing here mutates the engine. A renderer consumes a
//! [`RenderSnapshot`] and never reaches into the model directly.

use crate::{
    catalog::{BuildingCatalog, Category},
    engine::CityEngine,
    grid::GridStore,
    interaction::Tool,
    types::{Cell, Tile},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawTile {
    pub i:        usize,
    pub j:        usize,
    pub tile:     Tile,
    pub category: Category,
    /// Screen-space centre.
    pub x:        f64,
    pub y:        f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverView {
    pub i:         usize,
    pub j:         usize,
    pub in_bounds: bool,
    /// Whether the selected placement tool may be used here.
    pub legal:     Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub n:        usize,
    pub scale:    f64,
    /// Non-empty tiles in painter's order (back to front).
    pub tiles:    Vec<DrawTile>,
    pub hover:    Option<HoverView>,
    /// Cells served by the hovered service building.
    pub coverage: Vec<Cell>,
}

impl RenderSnapshot {
    pub fn capture(engine: &CityEngine) -> Self {
        let grid = engine.grid();
        let catalog = engine.catalog();
        let view = engine.view();

        let mut tiles: Vec<DrawTile> = grid
            .occupied()
            .map(|(i, j, tile)| {
                let (x, y) = view.cell_to_screen(i, j);
                DrawTile { i, j, tile, category: catalog.category(tile), x, y }
            })
            .collect();
        tiles.sort_by_key(|t| (t.i + t.j, t.i));

        let interaction = engine.interaction();
        let hover = interaction.hover.map(|pick| HoverView {
            i:         pick.i,
            j:         pick.j,
            in_bounds: pick.in_bounds,
            legal:     match interaction.tool {
                Tool::Place { tile } => Some(pick.in_bounds && engine.can_place(tile, pick.i, pick.j).is_ok()),
                _ => None,
            },
        });
        let coverage = match interaction.hover {
            Some(pick) if pick.in_bounds => engine.coverage().service_area(pick.i, pick.j),
            _ => Vec::new(),
        };

        Self { n: grid.size(), scale: view.scale, tiles, hover, coverage }
    }
}

/// One character per cell, one line per row.
pub fn ascii_map(grid: &GridStore, catalog: &BuildingCatalog) -> String {
    let n = grid.size();
    let mut out = String::with_capacity(n * (n + 1));
    for (i, j, tile) in grid.cells() {
        let glyph = if tile.is_empty() {
            Category::Empty.glyph()
        } else {
            match catalog.get(tile) {
                Some(entry) => entry.category.glyph(),
                None => '?',
            }
        };
        out.push(glyph);
        if j + 1 == n {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_map_uses_category_glyphs() {
        let mut grid = GridStore::new(3);
        grid.set(0, 0, Tile(0, 1)).unwrap();
        grid.set(0, 1, Tile(1, 0)).unwrap();
        grid.set(1, 1, Tile(4, 0)).unwrap();
        grid.set(2, 2, Tile(9, 9)).unwrap();
        let map = ascii_map(&grid, &BuildingCatalog::standard());
        assert_eq!(map, "#h.\n.k.\n..?\n");
    }
}
