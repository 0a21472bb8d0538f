//! Placement rule tests: the first-road exemption, orthogonal adjacency,
//! and randomized checks of both predicates against a brute-force oracle.

use isostadt_core::{
    catalog::BuildingCatalog,
    clock::ManualClock,
    engine::CityEngine,
    error::Denied,
    grid::GridStore,
    placement::PlacementValidator,
    types::Tile,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

const ROAD: Tile = Tile(0, 1);
const CROSSING: Tile = Tile(0, 11);
const COTTAGE: Tile = Tile(1, 0);
const CHEAP_KIOSK: Tile = Tile(4, 0);

fn build(map_key: &str) -> CityEngine {
    CityEngine::build_test(map_key, ManualClock::at_millis(1_700_000_000_000))
        .expect("build test engine")
}

/// Fill a grid at random with a mix of roads, buildings and empty cells.
fn random_grid(rng: &mut Pcg64Mcg, catalog: &BuildingCatalog) -> GridStore {
    let n = 2 * rng.gen_range(2..9usize);
    let tiles: Vec<Tile> = catalog.entries().iter().map(|e| e.tile).collect();
    let density = rng.gen_range(0.0..0.5);
    let mut grid = GridStore::new(n);
    for i in 0..n {
        for j in 0..n {
            if rng.gen_bool(density) {
                let tile = tiles[rng.gen_range(0..tiles.len())];
                grid.set(i, j, tile).unwrap();
            }
        }
    }
    grid
}

fn oracle_road_neighbour(grid: &GridStore, catalog: &BuildingCatalog, i: usize, j: usize) -> bool {
    let n = grid.size() as i64;
    [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)].iter().any(|(di, dj)| {
        let (ni, nj) = (i as i64 + di, j as i64 + dj);
        (0..n).contains(&ni)
            && (0..n).contains(&nj)
            && catalog.is_road(grid.get(ni as usize, nj as usize).unwrap())
    })
}

/// Scenario: first road anywhere, building next to it, building far away.
#[test]
fn first_road_then_adjacent_building() {
    let mut engine = build("placement-scenario-a");

    assert!(engine.place(8, 8, ROAD).is_ok(), "first road must be legal");
    assert!(engine.place(8, 9, COTTAGE).is_ok(), "building next to road must be legal");

    let denied = engine.place(0, 0, COTTAGE).unwrap_err();
    assert_eq!(denied, Denied::NeedsAdjacentRoad);
    assert_eq!(denied.to_string(), "Needs adjacent road");
    assert_eq!(engine.grid().occupied().count(), 2);
}

/// Placing over an occupied cell is refused with its own reason.
#[test]
fn occupied_field_is_refused() {
    let mut engine = build("placement-occupied");
    engine.place(8, 8, ROAD).unwrap();
    let balance = engine.economy().balance;

    assert_eq!(engine.place(8, 8, CROSSING), Err(Denied::FieldOccupied));
    assert_eq!(engine.grid().get(8, 8), Some(ROAD));
    assert_eq!(engine.economy().balance, balance, "refusal must not charge");
}

/// A second road must touch the network; a diagonal does not count.
#[test]
fn second_road_needs_orthogonal_contact() {
    let mut engine = build("placement-second-road");
    engine.place(8, 8, ROAD).unwrap();

    assert_eq!(engine.place(9, 9, ROAD), Err(Denied::NeedsAdjacentRoad));
    assert!(engine.place(9, 8, ROAD).is_ok());
    assert!(engine.place(9, 9, ROAD).is_ok());
}

/// Every purchase is charged; unaffordable tiles are refused untouched.
#[test]
fn placement_charges_price_and_refuses_overspend() {
    let mut engine = build("placement-funds");
    let start = engine.economy().balance;
    engine.place(8, 8, ROAD).unwrap();
    engine.place(8, 9, CHEAP_KIOSK).unwrap();
    assert_eq!(engine.economy().balance, start - 100 - 500);

    // Office complex costs 12,000; buy until it no longer fits.
    let complex = Tile(5, 3);
    engine.place(7, 8, complex).unwrap();
    let left = engine.economy().balance;
    assert!(left < 12_000);
    assert_eq!(
        engine.place(9, 8, complex),
        Err(Denied::InsufficientFunds { needed: 12_000, available: left })
    );
    assert!(engine.grid().is_empty(9, 8));
}

/// Demolition clears a cell without refund; empty cells are refused.
#[test]
fn demolish_clears_without_refund() {
    let mut engine = build("placement-demolish");
    engine.place(8, 8, ROAD).unwrap();
    let balance = engine.economy().balance;

    assert!(engine.demolish(8, 8).is_ok());
    assert!(engine.grid().is_empty(8, 8));
    assert_eq!(engine.economy().balance, balance);
    assert_eq!(engine.demolish(8, 8), Err(Denied::NothingToDemolish));
    assert_eq!(engine.demolish(40, 8), Err(Denied::OutOfBounds));
}

/// canPlaceRoad ⇔ (no road anywhere) ∨ (an orthogonal neighbour is a road).
#[test]
fn road_rule_matches_oracle_on_random_grids() {
    let catalog = BuildingCatalog::standard();
    let mut rng = Pcg64Mcg::seed_from_u64(0x15057AD7);

    for _ in 0..200 {
        let grid = random_grid(&mut rng, &catalog);
        let validator = PlacementValidator::new(&grid, &catalog);
        let any_road = grid.occupied().any(|(_, _, t)| catalog.is_road(t));

        for (i, j, _) in grid.cells() {
            let expected = !any_road || oracle_road_neighbour(&grid, &catalog, i, j);
            assert_eq!(
                validator.can_place_road(i, j).is_ok(),
                expected,
                "road rule mismatch at ({i}, {j}) on {n}x{n}",
                n = grid.size()
            );
        }
    }
}

/// canPlaceBuilding ⇔ an orthogonal neighbour is a road.
#[test]
fn building_rule_matches_oracle_on_random_grids() {
    let catalog = BuildingCatalog::standard();
    let mut rng = Pcg64Mcg::seed_from_u64(0xB01D);

    for _ in 0..200 {
        let grid = random_grid(&mut rng, &catalog);
        let validator = PlacementValidator::new(&grid, &catalog);

        for (i, j, _) in grid.cells() {
            let expected = oracle_road_neighbour(&grid, &catalog, i, j);
            assert_eq!(
                validator.can_place_building(i, j).is_ok(),
                expected,
                "building rule mismatch at ({i}, {j})"
            );
        }
    }
}
