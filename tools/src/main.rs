//! city-runner: headless driver for the isometric city builder.
//!
//! Usage:
//!   city-runner --map-key alice --db maps.db --local-db local.db
//!   city-runner --map-key alice --offline --ipc-mode

use anyhow::Result;
use isostadt_core::{
    catalog::BuildingCatalog,
    clock::SystemClock,
    command::{CommandReply, PlayerCommand},
    config::EngineConfig,
    engine::CityEngine,
    interaction::Notice,
    persistence::{MapService, OfflineMapService, PersistenceGateway, StoreMapService},
    render::{ascii_map, RenderSnapshot},
    store::CityStore,
    types::DEFAULT_MAP_KEY,
};
use chrono::Duration;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Command { command: PlayerCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    map_key:             String,
    load_source:         &'static str,
    n:                   usize,
    balance:             i64,
    stars:               u32,
    monthly_tax:         i64,
    population:          i64,
    next_expansion_cost: i64,
    reply:               Option<CommandReply>,
    notices:             Vec<Notice>,
    render:              RenderSnapshot,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let offline = args.iter().any(|a| a == "--offline");
    let map_key = str_arg(&args, "--map-key", DEFAULT_MAP_KEY);
    let db = str_arg(&args, "--db", ":memory:");
    let local_db = str_arg(&args, "--local-db", ":memory:");
    let data_dir = str_arg(&args, "--data-dir", "./data");

    if !ipc_mode {
        println!("Isostadt city-runner");
        println!("  map_key:   {map_key}");
        println!("  db:        {}", if offline { "(offline)" } else { db });
        println!("  local_db:  {local_db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = EngineConfig::load(data_dir).unwrap_or_else(|e| {
        log::warn!("{e}; using built-in engine defaults");
        EngineConfig::default_test()
    });
    let catalog = BuildingCatalog::load(data_dir).unwrap_or_else(|e| {
        log::warn!("{e}; using built-in catalog");
        BuildingCatalog::standard()
    });

    let remote: Box<dyn MapService> = if offline {
        Box::new(OfflineMapService)
    } else {
        Box::new(StoreMapService::new(CityStore::open_migrated(&effective_path(db, "maps"))?))
    };
    let local = CityStore::open_migrated(&effective_path(local_db, "local"))?;
    let gateway = PersistenceGateway::new(
        map_key,
        remote,
        local,
        Duration::milliseconds(config.save_debounce_ms),
    );

    let mut engine = CityEngine::open(config, catalog, gateway, Box::new(SystemClock));

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        print_summary(&engine);
    }
    engine.flush_save();

    Ok(())
}

fn run_ipc_loop(engine: &mut CityEngine) -> Result<()> {
    let lines = spawn_stdin_reader();
    let mut stdout = io::stdout();

    loop {
        // Wait for input, but no longer than the pending save allows.
        let next = match engine.save_due_in() {
            Some(wait) => lines.recv_timeout(wait.to_std().unwrap_or_default()),
            None => lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        let line = match next {
            Ok(line) => line?,
            Err(RecvTimeoutError::Timeout) => {
                engine.poll_save();
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break, // EOF
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => None,
            IpcCommand::Command { command } => Some(engine.apply(command)),
        };
        engine.poll_save();

        let state = build_ui_state(engine, reply);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Forward stdin lines from a background thread so the IPC loop can
/// time out while the player is idle.
fn spawn_stdin_reader() -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn build_ui_state(engine: &mut CityEngine, reply: Option<CommandReply>) -> UiState {
    let notices = engine.notices().to_vec();
    let assessment = engine.assess_month();
    let economy = engine.economy();

    UiState {
        map_key:             engine.gateway().map_key().to_string(),
        load_source:         engine.load_source().label(),
        n:                   engine.grid().size(),
        balance:             economy.balance,
        stars:               economy.stars,
        monthly_tax:         assessment.total_tax,
        population:          assessment.population,
        next_expansion_cost: engine.next_expansion_cost(),
        reply,
        notices,
        render:              engine.render_snapshot(),
    }
}

fn print_summary(engine: &CityEngine) {
    let economy = engine.economy();
    let assessment = engine.assess_month();

    println!("=== CITY SUMMARY ===");
    println!("  loaded from:    {}", engine.load_source().label());
    println!("  grid:           {n}x{n}", n = engine.grid().size());
    println!("  buildings:      {}", engine.grid().occupied().count());
    println!("  balance:        {}", economy.balance);
    println!("  stars:          {}", economy.stars);
    println!("  next month tax: {}", assessment.total_tax);
    println!("  population:     {}", assessment.population);
    println!("  next expansion: {}", engine.next_expansion_cost());

    println!();
    println!("=== MAP ===");
    print!("{}", ascii_map(engine.grid(), engine.catalog()));
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}

/// `:memory:` becomes a named shared-cache database so every connection
/// opened by this process sees the same data.
fn effective_path(db: &str, name: &str) -> String {
    if db == ":memory:" {
        format!("file:city_{name}_{}?mode=memory&cache=shared", chrono::Utc::now().timestamp_millis())
    } else {
        db.to_string()
    }
}
