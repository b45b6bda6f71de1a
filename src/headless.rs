//! Headless self-play: a fixed column policy drives the engine without a terminal.

use serde::Serialize;
use tracing::{debug, info};

use merge_drop_core::Grid;
use merge_drop_engine::{EngineConfig, GameEngine};
use merge_drop_types::{CyclePhase, Lifecycle, GRID_WIDTH, TICK_MS};

use crate::config::AppConfig;

/// Ticks allowed per requested drop before the run is abandoned
const TICKS_PER_DROP: u64 = 4_000;

/// Result of a headless run, printed as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadlessSummary {
    pub seed: u32,
    pub drops: u32,
    pub ticks: u64,
    pub score: u64,
    pub best_score: u64,
    pub coins: u64,
    pub level: u32,
    pub current_goal: u64,
    pub lifecycle: &'static str,
    pub game_over_cause: Option<&'static str>,
    pub grid: Vec<Vec<u64>>,
}

/// Column for a tile of `value`, or None when no column can take a tile.
///
/// Prefers landing on an equal value, then beside one, then the emptiest
/// column, then the lowest index.
pub fn choose_column(grid: &Grid, value: u64) -> Option<u8> {
    grid.drop_ready_columns()
        .into_iter()
        .filter_map(|column| {
            let row = grid.lowest_empty_row(column)?;
            let below = grid.get(row + 1, column) == Some(value);
            let beside = [column.checked_sub(1), Some(column + 1)]
                .into_iter()
                .flatten()
                .filter(|c| *c < GRID_WIDTH)
                .any(|c| grid.get(row, c) == Some(value));
            let affinity = u8::from(below) * 2 + u8::from(beside);
            Some((column, affinity, grid.occupied_in_column(column)))
        })
        .min_by_key(|&(column, affinity, occupied)| {
            (std::cmp::Reverse(affinity), occupied, column)
        })
        .map(|(column, _, _)| column)
}

/// Play up to `drops` tiles with no delays and no persistence.
pub fn run_headless(config: &AppConfig, seed: u32, drops: u32) -> HeadlessSummary {
    let engine_config = EngineConfig::headless()
        .with_seed(seed)
        .with_rotation(config.rotation);
    let mut engine = GameEngine::new(engine_config);
    engine.start();
    info!(seed, drops, "headless run started");

    let max_ticks = u64::from(drops) * TICKS_PER_DROP + TICKS_PER_DROP;
    let mut ticks = 0u64;
    let mut redirected = 0u32;

    while ticks < max_ticks {
        if engine.lifecycle() == Lifecycle::GameOver {
            break;
        }
        if engine.tile_id() >= drops && engine.phase() == CyclePhase::Idle {
            break;
        }

        if engine.phase() == CyclePhase::Sliding && engine.tile_id() != redirected {
            redirected = engine.tile_id();
            if let Some(value) = engine.sliding_tile().map(|t| t.value) {
                if let Some(column) = choose_column(engine.grid(), value) {
                    debug!(tile_id = redirected, value, column, "policy drop");
                    engine.select_column(column);
                }
            }
        }

        engine.advance(TICK_MS);
        ticks += 1;
    }

    let summary = HeadlessSummary {
        seed,
        drops: engine.tile_id(),
        ticks,
        score: engine.score(),
        best_score: engine.best_score(),
        coins: engine.coins(),
        level: engine.level(),
        current_goal: engine.current_goal(),
        lifecycle: engine.lifecycle().as_str(),
        game_over_cause: engine.game_over_cause().map(|c| c.as_str()),
        grid: engine.grid().rows().iter().map(|r| r.to_vec()).collect(),
    };
    info!(
        score = summary.score,
        drops = summary.drops,
        lifecycle = summary.lifecycle,
        "headless run finished"
    );
    summary
}
