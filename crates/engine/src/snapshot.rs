//! Per-tick read-only view of the engine for render sinks

use std::hash::{Hash, Hasher};

use arrayvec::ArrayVec;

use merge_drop_core::{FallingTile, SlidingTile};
use merge_drop_types::{
    CyclePhase, EffectKind, GameOverCause, Lifecycle, GRID_HEIGHT, GRID_WIDTH, MAX_ACTIVE_VALUES,
    QUEUE_LEN, START_COLUMN,
};

/// Effects kept at once; the oldest is dropped when full
pub const MAX_EFFECTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingSnapshot {
    pub value: u64,
    pub source_column: u8,
    pub target_column: u8,
    pub progress: f32,
    /// Interpolated column for drawing
    pub column_pos: f32,
}

impl From<SlidingTile> for SlidingSnapshot {
    fn from(tile: SlidingTile) -> Self {
        Self {
            value: tile.value,
            source_column: tile.source_column,
            target_column: tile.target_column,
            progress: tile.progress,
            column_pos: tile.visual_column(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallingSnapshot {
    pub value: u64,
    pub column: u8,
    pub target_row: u8,
    pub progress: f32,
    /// Eased row for drawing
    pub row_pos: f32,
}

impl From<FallingTile> for FallingSnapshot {
    fn from(tile: FallingTile) -> Self {
        Self {
            value: tile.value,
            column: tile.column,
            target_row: tile.target_row,
            progress: tile.progress,
            row_pos: tile.visual_row(),
        }
    }
}

/// A transient visual state and its remaining lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectSnapshot {
    pub kind: EffectKind,
    pub remaining_ms: u32,
}

impl EffectSnapshot {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            remaining_ms: kind.duration_ms(),
        }
    }

    /// Elapsed share of the lifetime in [0, 1]
    pub fn age(&self) -> f32 {
        let total = self.kind.duration_ms().max(1) as f32;
        1.0 - (self.remaining_ms as f32 / total).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub grid: [[u64; GRID_WIDTH as usize]; GRID_HEIGHT as usize],
    pub sliding: Option<SlidingSnapshot>,
    pub falling: Option<FallingSnapshot>,
    pub effects: ArrayVec<EffectSnapshot, MAX_EFFECTS>,
    pub dangerous_columns: [bool; GRID_WIDTH as usize],
    pub score: u64,
    pub best_score: u64,
    pub coins: u64,
    pub current_goal: u64,
    pub level: u32,
    pub slide_speed: f32,
    pub available_values: ArrayVec<u64, MAX_ACTIVE_VALUES>,
    pub next_queue: [u64; QUEUE_LEN],
    pub lifecycle: Lifecycle,
    pub phase: CyclePhase,
    pub game_over_cause: Option<GameOverCause>,
    pub last_drop_column: u8,
    pub pass_count: u32,
    pub episode_id: u32,
    pub tile_id: u32,
    pub seed: u32,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether column selections are currently accepted
    pub fn accepts_selection(&self) -> bool {
        self.lifecycle == Lifecycle::Playing
            && matches!(self.phase, CyclePhase::Idle | CyclePhase::Sliding)
    }

    pub fn playable(&self) -> bool {
        self.lifecycle == Lifecycle::Playing
    }

    /// Deterministic hash of the discrete game state.
    ///
    /// Animation progress and effect timers are left out, so the value only
    /// changes when the grid, the tiles in play, or the counters change.
    pub fn state_hash(&self) -> u64 {
        let mut h = Fnv1aHasher::new();
        self.grid.hash(&mut h);
        self.sliding
            .map(|t| (t.value, t.source_column, t.target_column))
            .hash(&mut h);
        self.falling.map(|t| (t.value, t.column, t.target_row)).hash(&mut h);
        self.next_queue.hash(&mut h);
        self.available_values.as_slice().hash(&mut h);
        self.score.hash(&mut h);
        self.best_score.hash(&mut h);
        self.coins.hash(&mut h);
        self.current_goal.hash(&mut h);
        self.lifecycle.hash(&mut h);
        self.phase.hash(&mut h);
        self.game_over_cause.hash(&mut h);
        self.last_drop_column.hash(&mut h);
        self.pass_count.hash(&mut h);
        self.episode_id.hash(&mut h);
        self.tile_id.hash(&mut h);
        self.seed.hash(&mut h);
        h.finish()
    }
}

/// Stable 64-bit FNV-1a hasher.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions, and
/// observation hashes are compared by external clients.
#[derive(Debug, Clone)]
pub struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            grid: [[0; GRID_WIDTH as usize]; GRID_HEIGHT as usize],
            sliding: None,
            falling: None,
            effects: ArrayVec::new(),
            dangerous_columns: [false; GRID_WIDTH as usize],
            score: 0,
            best_score: 0,
            coins: 0,
            current_goal: 0,
            level: 0,
            slide_speed: 0.0,
            available_values: ArrayVec::new(),
            next_queue: [0; QUEUE_LEN],
            lifecycle: Lifecycle::AwaitingStart,
            phase: CyclePhase::Idle,
            game_over_cause: None,
            last_drop_column: START_COLUMN,
            pass_count: 0,
            episode_id: 0,
            tile_id: 0,
            seed: 0,
        }
    }
}
