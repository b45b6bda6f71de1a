//! Merge Drop terminal runner (default binary).
//!
//! Plays in the terminal with a framebuffer renderer and, unless disabled, a
//! TCP adapter for remote controllers. `merge-drop headless` plays without a
//! terminal and prints a JSON summary.

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{info, warn};

use merge_drop::adapter::Adapter;
use merge_drop::config::AppConfig;
use merge_drop::engine::{GameEngine, GameSnapshot};
use merge_drop::headless::run_headless;
use merge_drop::input::{should_quit, InputHandler};
use merge_drop::logging;
use merge_drop::store::FileBestScoreStore;
use merge_drop::submit::JsonlScoreLog;
use merge_drop::term::{
    AdapterStatusView, FrameBuffer, GameView, Hud, RenderThrottle, TerminalRenderer, Viewport,
};
use merge_drop::types::{GameAction, TICK_MS};

/// Redraw interval while nothing moves
const STATIC_RENDER_INTERVAL_MS: u64 = 250;

#[derive(Debug, Parser)]
#[command(name = "merge-drop", version, about = "Power-of-two merge-drop puzzle")]
struct Cli {
    /// Tile generator seed (overrides MERGE_DROP_SEED)
    #[arg(long, global = true)]
    seed: Option<u32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play without a terminal using a built-in column policy
    Headless {
        /// Number of tiles to drop
        #[arg(long, default_value_t = 200)]
        drops: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    match cli.command {
        Some(Command::Headless { drops }) => {
            logging::init_stderr()?;
            let summary = run_headless(&config, config.resolve_seed(), drops);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        None => {
            if let Some(path) = &config.log_path {
                logging::init_file(path)?;
            }
            let mut term = TerminalRenderer::new();
            term.enter()?;
            let result = run(&mut term, &config);
            // Always try to restore terminal state.
            let _ = term.exit();
            result
        }
    }
}

fn run(term: &mut TerminalRenderer, config: &AppConfig) -> Result<()> {
    let seed = config.resolve_seed();
    let mut engine = GameEngine::new(config.engine_config(seed));
    engine.set_best_score_store(Box::new(FileBestScoreStore::new(&config.best_score_path)));
    if let Some(path) = &config.score_log_path {
        engine.set_score_submitter(Box::new(JsonlScoreLog::new(path)));
    }
    info!(seed, "terminal session started");

    let mut adapter = match Adapter::start_from_env() {
        Ok(adapter) => adapter,
        Err(e) => {
            warn!(error = %e, "adapter unavailable; playing without it");
            None
        }
    };

    let view = GameView::default();
    let mut input = InputHandler::new();
    let mut snap = GameSnapshot::default();
    let mut fb = FrameBuffer::new(0, 0);
    let mut throttle = RenderThrottle::new(STATIC_RENDER_INTERVAL_MS);

    let started = Instant::now();
    let tick_duration = Duration::from_millis(u64::from(TICK_MS));
    let mut last_tick = Instant::now();
    let mut last_size = (0u16, 0u16);

    loop {
        match adapter.as_mut() {
            Some(adapter) => {
                adapter.pump(&mut engine, &mut snap);
            }
            None => engine.snapshot_into(&mut snap),
        }

        // Render.
        let size = crossterm::terminal::size().unwrap_or((80, 24));
        let resized = size != last_size;
        if resized {
            last_size = size;
            term.invalidate();
        }
        let now_ms = started.elapsed().as_millis() as u64;
        let hud = Hud {
            cursor: Some(input.cursor()),
            adapter: adapter.as_ref().map(|a| {
                let status = a.status();
                AdapterStatusView {
                    enabled: true,
                    client_count: status.client_count().min(u16::MAX as usize) as u16,
                    controller_id: status.controller_id(),
                    streaming_count: status.streaming_count().min(u16::MAX as usize) as u16,
                }
            }),
        };
        if throttle.should_render_snapshot(now_ms, &snap, input.cursor()) || resized {
            view.render_into(&snap, &hud, Viewport::new(size.0, size.1), &mut fb);
            term.draw_swap(&mut fb)?;
        }

        // Input with timeout until next tick.
        let timeout = tick_duration.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if should_quit(key) {
                        info!(score = engine.score(), "quit");
                        return Ok(());
                    }
                    if let Some(action) = input.handle_key(key, engine.lifecycle()) {
                        engine.apply_action(action);
                        if action == GameAction::Restart {
                            input.reset();
                        }
                    }
                }
                Event::Resize(..) => term.invalidate(),
                _ => {}
            }
        }

        // Tick.
        let elapsed = last_tick.elapsed();
        if elapsed >= tick_duration {
            last_tick = Instant::now();
            engine.advance(elapsed.as_millis().min(u128::from(u32::MAX)) as u32);
        }
    }
}
