//! The city engine: the single owner of all mutable state.
//!
//! CONTROL FLOW (every mutation, synchronously, inside one input handler):
//!   1. Hit test (pointer commands only)
//!   2. Placement / funds / stars checks; refusal leaves state untouched
//!   3. Grid and economy mutation
//!   4. Journal entry + local snapshot + debounced remote save
//!
//! RULES:
//!   - Refusals are reported as `Denied` plus a short-lived notice. They
//!     are never fatal.
//!   - Persistence failures are absorbed by the gateway. No engine
//!     operation fails because the network did.
//!   - The model never knows about drawing; see `render.rs`.

use crate::{
    catalog::{BuildingCatalog, Category},
    clock::{Clock, ManualClock},
    command::{CommandReply, PlayerCommand},
    config::EngineConfig,
    coords::{CoordinateSystem, TilePick},
    coverage::CoverageIndex,
    economy::{self, EconomySimulator, EconomyState, MonthlyAssessment, MonthlyReport},
    error::{CityResult, Denied},
    event::CityEvent,
    grid::GridStore,
    interaction::{InteractionState, Notice, NoticeBoard, Tool},
    persistence::{LoadSource, PersistenceGateway, SaveOutcome, StoreMapService},
    placement::PlacementValidator,
    render::RenderSnapshot,
    snapshot::SaveSnapshot,
    store::CityStore,
    types::Tile,
};
use chrono::{DateTime, Duration, Utc};

pub struct CityEngine {
    config:      EngineConfig,
    catalog:     BuildingCatalog,
    grid:        GridStore,
    economy:     EconomyState,
    view:        CoordinateSystem,
    interaction: InteractionState,
    notices:     NoticeBoard,
    gateway:     PersistenceGateway,
    clock:       Box<dyn Clock>,
    load_source: LoadSource,
}

impl CityEngine {
    /// Load the city for the gateway's map key and wire up the engine.
    pub fn open(
        config:  EngineConfig,
        catalog: BuildingCatalog,
        gateway: PersistenceGateway,
        clock:   Box<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let base = config.base_grid_size;
        let outcome = gateway.load(base, config.initial_balance, now);

        // Expanded cities keep the original area where it was on screen.
        let mut view = CoordinateSystem::new(&config.view);
        for _ in 0..economy::expansions_done(outcome.city.grid.size(), base) {
            view.shift_for_ring();
        }

        let loaded = CityEvent::MapLoaded {
            map_key: gateway.map_key().to_string(),
            source:  outcome.source.label().to_string(),
            n:       outcome.city.grid.size(),
        };
        gateway.record_event(&loaded, now);

        Self {
            notices:     NoticeBoard::new(Duration::milliseconds(config.notice_ttl_ms)),
            grid:        outcome.city.grid,
            economy:     outcome.city.economy,
            load_source: outcome.source,
            interaction: InteractionState::default(),
            view,
            config,
            catalog,
            gateway,
            clock,
        }
    }

    /// Fully wired engine on in-memory stores, driven by a manual clock.
    pub fn build_test(map_key: &str, clock: ManualClock) -> CityResult<Self> {
        let config = EngineConfig::default_test();
        let remote = StoreMapService::new(CityStore::in_memory_migrated()?);
        let gateway = PersistenceGateway::new(
            map_key,
            Box::new(remote),
            CityStore::in_memory_migrated()?,
            Duration::milliseconds(config.save_debounce_ms),
        );
        Ok(Self::open(config, BuildingCatalog::standard(), gateway, Box::new(clock)))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Read access ────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn catalog(&self) -> &BuildingCatalog { &self.catalog }
    pub fn grid(&self) -> &GridStore { &self.grid }
    pub fn economy(&self) -> &EconomyState { &self.economy }
    pub fn view(&self) -> &CoordinateSystem { &self.view }
    pub fn interaction(&self) -> &InteractionState { &self.interaction }
    pub fn gateway(&self) -> &PersistenceGateway { &self.gateway }
    pub fn load_source(&self) -> LoadSource { self.load_source }

    pub fn coverage(&self) -> CoverageIndex<'_> {
        CoverageIndex::new(&self.grid, &self.catalog)
    }

    pub fn coverage_count(&self, category: Category, i: usize, j: usize) -> usize {
        self.coverage().coverage_count(category, i, j)
    }

    /// Everything `place` would check, without placing.
    pub fn can_place(&self, tile: Tile, i: usize, j: usize) -> Result<(), Denied> {
        PlacementValidator::new(&self.grid, &self.catalog).check(tile, i, j)?;
        let price = self.catalog.price(tile).ok_or(Denied::UnknownTile)?;
        self.economy.ensure_funds(price)
    }

    /// What next month would yield right now.
    pub fn assess_month(&self) -> MonthlyAssessment {
        EconomySimulator::new(&self.grid, &self.catalog).assess()
    }

    pub fn next_expansion_cost(&self) -> i64 {
        economy::expansion_cost(self.grid.size(), self.config.base_grid_size)
    }

    pub fn snapshot(&self) -> SaveSnapshot {
        SaveSnapshot::capture(&self.grid, &self.economy)
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(self)
    }

    /// Unexpired notices, oldest first.
    pub fn notices(&mut self) -> &[Notice] {
        let now = self.now();
        self.notices.active(now)
    }

    // ── Mutations ──────────────────────────────────────────────

    /// Buy and place `tile` at (i, j).
    pub fn place(&mut self, i: usize, j: usize, tile: Tile) -> Result<CityEvent, Denied> {
        let now = self.now();
        let result = self.try_place(i, j, tile, now);
        self.settle(result, now)
    }

    fn try_place(&mut self, i: usize, j: usize, tile: Tile, now: DateTime<Utc>) -> Result<CityEvent, Denied> {
        PlacementValidator::new(&self.grid, &self.catalog).check(tile, i, j)?;
        let entry = self.catalog.get(tile).ok_or(Denied::UnknownTile)?;
        let (price, category) = (entry.price, entry.category);
        self.economy.ensure_funds(price)?;

        self.grid.set(i, j, tile).map_err(|_| Denied::OutOfBounds)?;
        self.economy.debit(price, now)?;
        Ok(CityEvent::TilePlaced { i, j, tile, category, price, balance: self.economy.balance })
    }

    /// Clear (i, j). No refund.
    pub fn demolish(&mut self, i: usize, j: usize) -> Result<CityEvent, Denied> {
        let now = self.now();
        let result = match self.grid.get(i, j) {
            None => Err(Denied::OutOfBounds),
            Some(tile) if tile.is_empty() => Err(Denied::NothingToDemolish),
            Some(tile) => self
                .grid
                .set(i, j, Tile::EMPTY)
                .map(|_| CityEvent::TileDemolished { i, j, tile })
                .map_err(|_| Denied::OutOfBounds),
        };
        self.settle(result, now)
    }

    /// Spend a star, collect the month's tax.
    pub fn advance_month(&mut self) -> Result<MonthlyReport, Denied> {
        let now = self.now();
        let report = EconomySimulator::new(&self.grid, &self.catalog)
            .advance_month(&mut self.economy, now);
        let event = report.clone().map(|r| CityEvent::MonthAdvanced {
            total_tax:   r.total_tax,
            population:  r.population,
            new_balance: r.new_balance,
            stars_left:  self.economy.stars,
        });
        self.settle(event, now)?;
        report
    }

    /// Buy one ring of land around the map. Returns the price paid.
    pub fn expand_grid(&mut self) -> Result<i64, Denied> {
        let now = self.now();
        let paid = economy::expand_grid(
            &mut self.grid,
            &mut self.economy,
            self.config.base_grid_size,
            now,
        );
        if paid.is_ok() {
            self.view.shift_for_ring();
            self.interaction.hover = None;
        }
        let event = paid.clone().map(|cost| CityEvent::GridExpanded {
            new_n:   self.grid.size(),
            cost,
            balance: self.economy.balance,
        });
        self.settle(event, now)?;
        paid
    }

    /// Award stars earned elsewhere.
    pub fn grant_stars(&mut self, stars: u32) -> CityEvent {
        let now = self.now();
        self.economy.grant_stars(stars, now);
        let event = CityEvent::StarsGranted { granted: stars, stars: self.economy.stars };
        self.commit(&event, now);
        event
    }

    /// Shared tail of every mutation: journal and save on success,
    /// notice on refusal.
    fn settle(&mut self, result: Result<CityEvent, Denied>, now: DateTime<Utc>) -> Result<CityEvent, Denied> {
        match &result {
            Ok(event) => self.commit(event, now),
            Err(denied) => {
                log::debug!("refused: {denied}");
                self.notices.push(denied.to_string(), now);
            }
        }
        result
    }

    fn commit(&mut self, event: &CityEvent, now: DateTime<Utc>) {
        log::debug!("{}: {event:?}", event.type_name());
        self.economy.last_modified = now;
        self.gateway.record_event(event, now);
        self.gateway.schedule_save(self.snapshot(), now);
    }

    // ── Pointer and camera ─────────────────────────────────────

    pub fn select_tool(&mut self, tool: Tool) {
        self.interaction.tool = tool;
    }

    /// Track hover and apply an active pan drag.
    pub fn pointer_move(&mut self, px: f64, py: f64) -> TilePick {
        if let Some((dx, dy)) = self.interaction.drag_to(px, py) {
            self.view.pan_by(dx, dy);
        }
        let pick = self.view.pick(px, py, self.grid.size());
        self.interaction.hover = Some(pick);
        pick
    }

    pub fn pointer_down(&mut self, px: f64, py: f64) {
        self.interaction.begin_drag(px, py);
    }

    /// End a press. A press that never became a pan is a click.
    pub fn pointer_up(&mut self, px: f64, py: f64) -> Option<Result<CityEvent, Denied>> {
        if self.interaction.end_drag() {
            self.click(px, py)
        } else {
            None
        }
    }

    /// Apply the selected tool at the tile under the pointer.
    /// `None` when the tool does not act on tiles.
    pub fn click(&mut self, px: f64, py: f64) -> Option<Result<CityEvent, Denied>> {
        let pick = self.view.pick(px, py, self.grid.size());
        self.interaction.hover = Some(pick);
        let tool = self.interaction.tool;
        if tool == Tool::Inspect {
            return None;
        }
        if !pick.in_bounds {
            let now = self.now();
            return Some(self.settle(Err(Denied::OutOfBounds), now));
        }
        match tool {
            Tool::Place { tile } => Some(self.place(pick.i, pick.j, tile)),
            Tool::Demolish => Some(self.demolish(pick.i, pick.j)),
            Tool::Inspect => None,
        }
    }

    /// Zoom one notch around the pointer. Returns the new scale.
    pub fn wheel(&mut self, px: f64, py: f64, delta: f64) -> f64 {
        self.view.zoom_at(px, py, delta)
    }

    // ── Persistence ────────────────────────────────────────────

    /// Send the pending save if its debounce window has elapsed.
    pub fn poll_save(&mut self) -> SaveOutcome {
        let now = self.now();
        self.gateway.poll(now)
    }

    /// Time left before the pending save is due; zero once overdue.
    /// `None` when nothing is pending.
    pub fn save_due_in(&self) -> Option<Duration> {
        let now = self.now();
        self.gateway
            .scheduler()
            .deadline()
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }

    /// Send the pending save now.
    pub fn flush_save(&mut self) -> SaveOutcome {
        self.gateway.flush()
    }

    // ── Command dispatch ───────────────────────────────────────

    pub fn apply(&mut self, command: PlayerCommand) -> CommandReply {
        fn reply(result: Result<CityEvent, Denied>) -> CommandReply {
            match result {
                Ok(event) => CommandReply::Applied { event },
                Err(denied) => CommandReply::Denied { reason: denied.to_string() },
            }
        }

        match command {
            PlayerCommand::Place { i, j, tile } => reply(self.place(i, j, tile)),
            PlayerCommand::Demolish { i, j } => reply(self.demolish(i, j)),
            PlayerCommand::AdvanceMonth => match self.advance_month() {
                Ok(report) => CommandReply::Month { report },
                Err(denied) => CommandReply::Denied { reason: denied.to_string() },
            },
            PlayerCommand::Expand => reply(self.expand_grid().map(|cost| CityEvent::GridExpanded {
                new_n:   self.grid.size(),
                cost,
                balance: self.economy.balance,
            })),
            PlayerCommand::GrantStars { stars } => CommandReply::Applied { event: self.grant_stars(stars) },
            PlayerCommand::SelectTool { tool } => {
                self.select_tool(tool);
                CommandReply::Ok
            }
            PlayerCommand::PointerMove { x, y } => CommandReply::Hover { pick: self.pointer_move(x, y) },
            PlayerCommand::PointerDown { x, y } => {
                self.pointer_down(x, y);
                CommandReply::Ok
            }
            PlayerCommand::PointerUp { x, y } => self.pointer_up(x, y).map_or(CommandReply::Ok, reply),
            PlayerCommand::Click { x, y } => self.click(x, y).map_or(CommandReply::Ok, reply),
            PlayerCommand::Wheel { x, y, delta } => CommandReply::Zoom { scale: self.wheel(x, y, delta) },
            PlayerCommand::PollSave => CommandReply::Save { outcome: self.poll_save() },
            PlayerCommand::Flush => CommandReply::Save { outcome: self.flush_save() },
        }
    }
}
