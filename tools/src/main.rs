//! lives-runner: headless driver for the lives engine.
//!
//! Usage:
//!   lives-runner --offline 1500 --db lives.db
//!   lives-runner --data-dir ./data --ipc-mode

use anyhow::Result;
use lives_core::{
    cheat::CheatPreset,
    clock::{ManualClock, TimeSource},
    config::PoolConfig,
    engine::{Grant, LivesEngine},
    event::LogSink,
    lifecycle::GameState,
    store::SaveStore,
    types::{Lives, Seconds},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    /// Advance the clock and run one frame.
    Tick { seconds: Seconds },
    /// Advance the clock without ticking (app in background or closed).
    Advance { seconds: Seconds },
    Reconcile,
    Spend,
    Grant {
        #[serde(default)]
        units: Option<Lives>,
        #[serde(default)]
        unlimited_minutes: Option<u32>,
    },
    GameState { previous: GameState, current: GameState },
    Pause { paused: bool },
    Cheat { preset: CheatPreset },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    now: Seconds,
    current: Lives,
    max: Lives,
    is_full: bool,
    has_lives: bool,
    is_unlimited: bool,
    time_to_next: Seconds,
    unlimited_remaining: Seconds,
    initialized: bool,
    pending_save: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let offline = parse_arg(&args, "--offline", 1_500.0f64);
    let start = parse_arg(&args, "--start", chrono::Utc::now().timestamp() as f64);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    let config = load_config(data_dir)?;

    if !ipc_mode {
        println!("Lives runner");
        println!("  db:        {db}");
        println!("  max:       {}", config.max_count);
        println!("  period:    {}s", config.refill_period_seconds);
        println!("  offline:   {offline}s");
        println!();
    }

    let store = SaveStore::open(db)?;
    store.migrate()?;
    let clock = ManualClock::new(start);

    let mut engine = LivesEngine::open(config, Box::new(clock.clone()), Box::new(store))?;
    engine.subscribe(Box::new(LogSink));
    engine.initialize();

    if ipc_mode {
        run_ipc_loop(&mut engine, &clock)?;
        engine.shutdown()?;
    } else {
        run_session(engine, &clock, offline)?;
    }

    Ok(())
}

/// Fall back to built-in defaults when no config file is shipped.
fn load_config(data_dir: &str) -> Result<PoolConfig> {
    let path = format!("{data_dir}/lives/lives_config.json");
    if Path::new(&path).exists() {
        PoolConfig::load(data_dir)
    } else {
        log::info!("{path} not found, using built-in defaults");
        Ok(PoolConfig::default_test())
    }
}

/// Play and fail a level, close the app mid-level, come back later.
fn run_session(mut engine: LivesEngine, clock: &ManualClock, offline: Seconds) -> Result<()> {
    engine.on_network_time_changed()?;
    print_line("start", &engine, clock);

    engine.on_game_state_changed(GameState::Menu, GameState::Level);
    clock.advance(90.0);
    engine.tick(90.0);
    engine.on_game_state_changed(GameState::Level, GameState::Fail);
    print_line("level failed", &engine, clock);

    engine.on_game_state_changed(GameState::Fail, GameState::Level);
    engine.on_app_pause_changed(true);
    engine.shutdown()?;
    print_line("app closed mid-level", &engine, clock);

    clock.advance(offline);
    let config = engine.config().clone();
    let backend = engine.into_backend();
    let mut engine = LivesEngine::open(config, Box::new(clock.clone()), backend)?;
    engine.subscribe(Box::new(LogSink));
    print_line("reopened", &engine, clock);

    engine.on_network_time_changed()?;
    print_line("reconciled", &engine, clock);

    engine.shutdown()?;

    println!();
    println!("=== SESSION SUMMARY ===");
    println!("  lives:          {}/{}", engine.current(), engine.max());
    println!("  next life in:   {:.0}s", engine.time_to_next());
    println!("  unlimited:      {}", engine.is_unlimited());
    Ok(())
}

fn print_line(label: &str, engine: &LivesEngine, clock: &ManualClock) {
    println!(
        "  t={:>10.0}  {label:<22} {}/{}  next={:.0}s",
        clock.now(),
        engine.current(),
        engine.max(),
        engine.time_to_next()
    );
}

fn run_ipc_loop(engine: &mut LivesEngine, clock: &ManualClock) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }
        handle_command(engine, clock, cmd)?;
        let state = build_ui_state(engine, clock);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(engine: &mut LivesEngine, clock: &ManualClock, cmd: IpcCommand) -> Result<()> {
    match cmd {
        IpcCommand::GetState | IpcCommand::Quit => {}
        IpcCommand::Tick { seconds } => {
            clock.advance(seconds);
            engine.tick(seconds);
        }
        IpcCommand::Advance { seconds } => {
            clock.advance(seconds);
        }
        IpcCommand::Reconcile => engine.on_network_time_changed()?,
        IpcCommand::Spend => {
            engine.spend(true);
        }
        IpcCommand::Grant { units, unlimited_minutes } => {
            if let Some(n) = units {
                engine.increase(Grant::Units(n));
            }
            if let Some(m) = unlimited_minutes {
                engine.increase(Grant::UnlimitedMinutes(m));
            }
            if units.is_none() && unlimited_minutes.is_none() {
                log::warn!("grant without units or unlimited_minutes ignored");
            }
        }
        IpcCommand::GameState { previous, current } => {
            engine.on_game_state_changed(previous, current);
        }
        IpcCommand::Pause { paused } => engine.on_app_pause_changed(paused),
        IpcCommand::Cheat { preset } => engine.apply_cheat(preset),
    }
    Ok(())
}

fn build_ui_state(engine: &LivesEngine, clock: &ManualClock) -> UiState {
    UiState {
        now: clock.now(),
        current: engine.current(),
        max: engine.max(),
        is_full: engine.is_full(),
        has_lives: engine.has_lives(),
        is_unlimited: engine.is_unlimited(),
        time_to_next: engine.time_to_next(),
        unlimited_remaining: engine.unlimited_remaining(),
        initialized: engine.is_initialized(),
        pending_save: engine.has_pending_save(),
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
