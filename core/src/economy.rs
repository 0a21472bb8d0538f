//! Economy: monthly tax/population tick and grid expansion pricing.
//!
//! The monthly tick is the only way balance goes up. Every voluntary spend
//! (tiles, expansions, the month action itself) is refused up front when
//! the player cannot afford it, so balance never goes negative by choice.
//!
//! The rates below are hand-tuned game balance. Note the asymmetry:
//! office coverage lifts house population but not townhouse population.

use crate::{
    catalog::{BuildingCatalog, Category},
    coverage::{CellCoverage, CoverageIndex},
    error::Denied,
    grid::{GridStore, MAX_GRID_SIZE},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TAX_RATE_PCT: i64 = 10;
pub const HOUSE_POP_RATE_PCT: i64 = 5;
pub const TOWNHOUSE_POP_RATE_PCT: i64 = 6;
pub const KIOSK_BONUS_PCT: i64 = 20;
pub const MARKET_BONUS_PCT: i64 = 40;
pub const OFFICE_BONUS_PCT: i64 = 20;
pub const OFFICE_HOUSE_POP_BOOST_PCT: i64 = 20;

/// Stars spent per "next month".
pub const MONTH_STAR_COST: u32 = 1;

/// Price of the first expansion; the k-th costs k times this.
pub const EXPANSION_STEP_COST: i64 = 10_000;

/// `round(value * pct / 100)` for non-negative values, halves rounding up.
fn pct_round(value: i64, pct: i64) -> i64 {
    (value * pct + 50).div_euclid(100)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyState {
    pub balance: i64,
    pub stars:   u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
}

impl EconomyState {
    pub fn new(balance: i64, stars: u32, now: DateTime<Utc>) -> Self {
        Self { balance, stars, last_modified: now }
    }

    /// Refuse any spend that exceeds the current balance.
    pub fn ensure_funds(&self, cost: i64) -> Result<(), Denied> {
        if cost > self.balance {
            return Err(Denied::InsufficientFunds { needed: cost, available: self.balance });
        }
        Ok(())
    }

    pub fn debit(&mut self, cost: i64, now: DateTime<Utc>) -> Result<(), Denied> {
        self.ensure_funds(cost)?;
        self.balance -= cost;
        self.last_modified = now;
        Ok(())
    }

    pub fn ensure_stars(&self, needed: u32) -> Result<(), Denied> {
        if needed > self.stars {
            return Err(Denied::InsufficientStars { needed, available: self.stars });
        }
        Ok(())
    }

    pub fn grant_stars(&mut self, stars: u32, now: DateTime<Utc>) {
        self.stars = self.stars.saturating_add(stars);
        self.last_modified = now;
    }
}

/// Output of one "next month". Shown to the player, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub total_tax:   i64,
    pub population:  i64,
    pub new_balance: i64,
}

/// Yield of one residential cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdYield {
    pub i:          usize,
    pub j:          usize,
    pub category:   Category,
    pub base_tax:   i64,
    pub bonus_pct:  i64,
    pub tax:        i64,
    pub population: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAssessment {
    pub total_tax:  i64,
    pub population: i64,
    pub households: Vec<HouseholdYield>,
}

pub struct EconomySimulator<'a> {
    grid:     &'a GridStore,
    catalog:  &'a BuildingCatalog,
    coverage: CoverageIndex<'a>,
}

impl<'a> EconomySimulator<'a> {
    pub fn new(grid: &'a GridStore, catalog: &'a BuildingCatalog) -> Self {
        Self { grid, catalog, coverage: CoverageIndex::new(grid, catalog) }
    }

    /// Yield of a residential building of `price` with the given coverage.
    pub fn household_yield(
        category: Category,
        price:    i64,
        coverage: CellCoverage,
    ) -> Option<(i64, i64, i64, i64)> {
        if !category.is_residential() {
            return None;
        }
        let base_tax = pct_round(price, TAX_RATE_PCT);
        let mut bonus_pct = 0;
        if coverage.kiosk > 0 {
            bonus_pct += KIOSK_BONUS_PCT;
        }
        if coverage.market > 0 {
            bonus_pct += MARKET_BONUS_PCT;
        }
        if coverage.office > 0 {
            bonus_pct += OFFICE_BONUS_PCT;
        }
        let tax = pct_round(base_tax, 100 + bonus_pct);

        let population = match category {
            Category::House => {
                let base_pop = pct_round(price, HOUSE_POP_RATE_PCT);
                if coverage.office > 0 {
                    pct_round(base_pop, 100 + OFFICE_HOUSE_POP_BOOST_PCT)
                } else {
                    base_pop
                }
            }
            _ => pct_round(price, TOWNHOUSE_POP_RATE_PCT),
        };
        Some((base_tax, bonus_pct, tax, population))
    }

    /// Compute this month's tax and population without touching any state.
    pub fn assess(&self) -> MonthlyAssessment {
        let mut assessment = MonthlyAssessment::default();
        for (i, j, tile) in self.grid.occupied() {
            let Some(entry) = self.catalog.get(tile) else { continue };
            let coverage = self.coverage.summary(i, j);
            let Some((base_tax, bonus_pct, tax, population)) =
                Self::household_yield(entry.category, entry.price, coverage)
            else {
                continue;
            };
            assessment.total_tax += tax;
            assessment.population += population;
            assessment.households.push(HouseholdYield {
                i,
                j,
                category: entry.category,
                base_tax,
                bonus_pct,
                tax,
                population,
            });
        }
        assessment
    }

    /// Spend one star and credit this month's tax.
    /// Refused without touching `economy` when no star is left.
    pub fn advance_month(
        &self,
        economy: &mut EconomyState,
        now:     DateTime<Utc>,
    ) -> Result<MonthlyReport, Denied> {
        economy.ensure_stars(MONTH_STAR_COST)?;
        let assessment = self.assess();

        economy.stars -= MONTH_STAR_COST;
        economy.balance += assessment.total_tax;
        economy.last_modified = now;

        log::info!(
            "month advanced: tax={} population={} balance={} stars={}",
            assessment.total_tax,
            assessment.population,
            economy.balance,
            economy.stars
        );

        Ok(MonthlyReport {
            total_tax:   assessment.total_tax,
            population:  assessment.population,
            new_balance: economy.balance,
        })
    }
}

/// Expansions already bought for an `n`×`n` grid grown from `base`.
pub fn expansions_done(n: usize, base: usize) -> usize {
    n.saturating_sub(base) / 2
}

/// Price of the next ring expansion.
pub fn expansion_cost(n: usize, base: usize) -> i64 {
    (expansions_done(n, base) as i64 + 1) * EXPANSION_STEP_COST
}

/// Buy one ring. Returns the amount paid.
pub fn expand_grid(
    grid:    &mut GridStore,
    economy: &mut EconomyState,
    base:    usize,
    now:     DateTime<Utc>,
) -> Result<i64, Denied> {
    if grid.size() + 2 > MAX_GRID_SIZE {
        return Err(Denied::MapAtMaximum);
    }
    let cost = expansion_cost(grid.size(), base);
    economy.debit(cost, now)?;
    grid.expand_ring();
    log::info!("grid expanded to {n}x{n} for {cost}", n = grid.size());
    Ok(cost)
}
