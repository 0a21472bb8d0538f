//! Monthly economy, stars and land expansion driven through the engine.

use isostadt_core::{
    catalog::{BuildingCatalog, Category},
    clock::ManualClock,
    config::EngineConfig,
    coverage::CoverageIndex,
    economy::{EconomySimulator, EXPANSION_STEP_COST},
    engine::CityEngine,
    error::Denied,
    grid::GridStore,
    persistence::{OfflineMapService, PersistenceGateway},
    store::CityStore,
    types::Tile,
};
use chrono::Duration;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

const ROAD: Tile = Tile(0, 1);
const COTTAGE: Tile = Tile(1, 0);
const VILLA: Tile = Tile(1, 3);
const TOWNHOUSE: Tile = Tile(2, 0);
const CHEAP_KIOSK: Tile = Tile(4, 0);
const SMALL_MARKET: Tile = Tile(3, 0);
const SMALL_OFFICE: Tile = Tile(5, 0);

fn build(map_key: &str) -> CityEngine {
    CityEngine::build_test(map_key, ManualClock::at_millis(1_700_000_000_000))
        .expect("build test engine")
}

fn build_with_balance(balance: i64) -> CityEngine {
    let config = EngineConfig { initial_balance: balance, ..EngineConfig::default_test() };
    let gateway = PersistenceGateway::new(
        "economy",
        Box::new(OfflineMapService),
        CityStore::in_memory_migrated().unwrap(),
        Duration::milliseconds(config.save_debounce_ms),
    );
    CityEngine::open(
        config,
        BuildingCatalog::standard(),
        gateway,
        Box::new(ManualClock::at_millis(1_700_000_000_000)),
    )
}

/// Scenario: one uncovered cottage pays 10 tax and houses 5.
#[test]
fn month_with_single_cottage() {
    let mut engine = build("economy-scenario-c");
    engine.place(8, 8, ROAD).unwrap();
    engine.place(8, 9, COTTAGE).unwrap();
    engine.grant_stars(1);
    let before = engine.economy().balance;

    let report = engine.advance_month().unwrap();
    assert_eq!(report.total_tax, 10);
    assert_eq!(report.population, 5);
    assert_eq!(report.new_balance, before + 10);
    assert_eq!(engine.economy().stars, 0);

    assert_eq!(
        engine.advance_month(),
        Err(Denied::InsufficientStars { needed: 1, available: 0 })
    );
    assert_eq!(engine.economy().balance, before + 10);
}

/// Every service category adds its bonus; offices also boost houses.
#[test]
fn full_coverage_stacks_bonuses() {
    let mut engine = build("economy-bonus");
    engine.place(8, 8, ROAD).unwrap();
    engine.place(8, 9, VILLA).unwrap();
    engine.place(7, 8, CHEAP_KIOSK).unwrap();
    engine.place(9, 8, SMALL_MARKET).unwrap();
    engine.place(8, 7, SMALL_OFFICE).unwrap();

    let assessment = engine.assess_month();
    assert_eq!(assessment.households.len(), 1);
    let villa = assessment.households[0];
    assert_eq!(villa.base_tax, 100);
    assert_eq!(villa.bonus_pct, 80);
    assert_eq!(villa.tax, 180);
    assert_eq!(villa.population, 60);
}

/// Townhouses get tax bonuses but no office population boost.
#[test]
fn townhouse_population_ignores_offices() {
    let mut engine = build("economy-townhouse");
    engine.place(8, 8, ROAD).unwrap();
    engine.place(8, 9, TOWNHOUSE).unwrap();
    engine.place(8, 7, SMALL_OFFICE).unwrap();

    let assessment = engine.assess_month();
    assert_eq!(assessment.total_tax, 96);
    assert_eq!(assessment.population, 48);
}

/// Tax is recomputed from the current grid each month, never accumulated.
#[test]
fn tax_follows_current_grid() {
    let mut engine = build("economy-recompute");
    engine.place(8, 8, ROAD).unwrap();
    engine.place(8, 9, COTTAGE).unwrap();
    engine.grant_stars(3);

    assert_eq!(engine.advance_month().unwrap().total_tax, 10);
    engine.place(7, 8, CHEAP_KIOSK).unwrap();
    assert_eq!(engine.advance_month().unwrap().total_tax, 12);
    engine.demolish(8, 9).unwrap();
    assert_eq!(engine.advance_month().unwrap().total_tax, 0);
}

/// The assessed total equals Σ round(round(price·0.10)·(1 + bonus)).
#[test]
fn tax_matches_float_formula_on_random_cities() {
    let catalog = BuildingCatalog::standard();
    let tiles: Vec<Tile> = catalog.entries().iter().map(|e| e.tile).collect();
    let mut rng = Pcg64Mcg::seed_from_u64(0x7A5);

    for _ in 0..100 {
        let n = 2 * rng.gen_range(3..10usize);
        let mut grid = GridStore::new(n);
        for i in 0..n {
            for j in 0..n {
                if rng.gen_bool(0.3) {
                    grid.set(i, j, tiles[rng.gen_range(0..tiles.len())]).unwrap();
                }
            }
        }

        let coverage = CoverageIndex::new(&grid, &catalog);
        let mut expected_tax = 0i64;
        let mut expected_pop = 0i64;
        for (i, j, tile) in grid.occupied() {
            let category = catalog.category(tile);
            if !category.is_residential() {
                continue;
            }
            let price = catalog.price(tile).unwrap() as f64;
            let c = coverage.summary(i, j);
            let bonus = if c.kiosk > 0 { 0.2 } else { 0.0 }
                + if c.market > 0 { 0.4 } else { 0.0 }
                + if c.office > 0 { 0.2 } else { 0.0 };
            expected_tax += ((price * 0.10).round() * (1.0 + bonus)).round() as i64;
            expected_pop += match category {
                Category::House if c.office > 0 => ((price * 0.05).round() * 1.2).round() as i64,
                Category::House => (price * 0.05).round() as i64,
                _ => (price * 0.06).round() as i64,
            };
        }

        let assessment = EconomySimulator::new(&grid, &catalog).assess();
        assert_eq!(assessment.total_tax, expected_tax);
        assert_eq!(assessment.population, expected_pop);
    }
}

/// Scenario: 5,000 is not enough for the first ring; 15,000 is.
#[test]
fn first_expansion_needs_ten_thousand() {
    let mut poor = build_with_balance(5_000);
    assert_eq!(
        poor.expand_grid(),
        Err(Denied::InsufficientFunds { needed: 10_000, available: 5_000 })
    );
    assert_eq!(poor.grid().size(), 16);

    let mut engine = build_with_balance(15_000);
    engine.place(0, 0, ROAD).unwrap();
    assert_eq!(engine.expand_grid(), Ok(10_000));
    assert_eq!(engine.grid().size(), 18);
    assert_eq!(engine.economy().balance, 15_000 - 100 - 10_000);
    assert_eq!(engine.grid().get(1, 1), Some(ROAD));
    assert!(engine.grid().is_empty(0, 0));
    assert_eq!(engine.next_expansion_cost(), 20_000);
}

/// Each ring costs one step more than the last.
#[test]
fn expansion_costs_rise_linearly() {
    let mut engine = build_with_balance(1_000_000);
    let costs: Vec<i64> = (0..5).map(|_| engine.expand_grid().unwrap()).collect();

    assert_eq!(costs, (1..=5).map(|k| k * EXPANSION_STEP_COST).collect::<Vec<_>>());
    assert_eq!(engine.grid().size(), 26);
    assert_eq!(engine.economy().balance, 1_000_000 - 150_000);
}

/// Expansion keeps every existing tile under the same screen point.
#[test]
fn expansion_keeps_city_in_place_on_screen() {
    let mut engine = build("economy-view-shift");
    let before = engine.view().cell_to_screen(3, 5);

    engine.expand_grid().unwrap();
    assert_eq!(engine.view().cell_to_screen(4, 6), before);
}
