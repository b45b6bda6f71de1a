//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are plain data with no external dependencies, so they can be used
//! from the rules crate, the terminal renderer, and the remote adapter alike.
//!
//! # Grid Dimensions
//!
//! The grid is 8 rows by 6 columns, row 0 at the top:
//!
//! | Rows | Role |
//! |------|------|
//! | 0 | Sliding lane (the incoming tile travels here) |
//! | 1 | Death check row (a tile landing here ends the game) |
//! | 2-7 | Playable field (merges, gravity, progression) |
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `START_DELAY_MS` | 500 | Delay before the first slide of a game |
//! | `NEXT_SLIDE_DELAY_MS` | 100 | Idle delay before the next automatic slide |
//! | `MERGE_PASS_DELAY_MS` | 300 | Pause between two cascade passes |
//!
//! # Tile Values
//!
//! Tiles are powers of two stored as `u64`; `0` is an empty cell. The game starts
//! with `[2, 4, 8, 16, 32, 64]` in play and a goal of 512.
//!
//! # Examples
//!
//! ```
//! use merge_drop_types::{GameAction, GRID_HEIGHT, GRID_WIDTH, FIRST_PLAYABLE_ROW};
//!
//! let action = GameAction::from_str("selectColumn:3").unwrap();
//! assert_eq!(action, GameAction::SelectColumn(3));
//! assert_eq!(action.as_str(), "selectColumn");
//!
//! assert_eq!(GRID_WIDTH, 6);
//! assert_eq!(GRID_HEIGHT, 8);
//! assert_eq!(FIRST_PLAYABLE_ROW, 2);
//! ```

/// Grid width in cells (6 columns)
pub const GRID_WIDTH: u8 = 6;

/// Grid height in cells (8 rows)
pub const GRID_HEIGHT: u8 = 8;

/// Row the incoming tile slides along
pub const SLIDE_ROW: u8 = 0;

/// Row that ends the game when a tile lands in it
pub const DEATH_ROW: u8 = 1;

/// First row of the playable field
pub const FIRST_PLAYABLE_ROW: u8 = 2;

/// Number of playable rows (2..=7)
pub const PLAYABLE_ROWS: u8 = GRID_HEIGHT - FIRST_PLAYABLE_ROW;

/// Upcoming tiles kept in the queue
pub const QUEUE_LEN: usize = 3;

/// Queue contents at the start of every game (front first)
pub const INITIAL_QUEUE: [u64; QUEUE_LEN] = [2, 4, 2];

/// Tile values in play at the start of every game
pub const INITIAL_VALUES: [u64; 6] = [2, 4, 8, 16, 32, 64];

/// Maximum number of simultaneously active tile values
pub const MAX_ACTIVE_VALUES: usize = 8;

/// First goal of a game
pub const INITIAL_GOAL: u64 = 512;

/// Coins granted to a fresh session
pub const STARTING_COINS: u64 = 320;

/// Merged value from which an achievement is awarded
pub const ACHIEVEMENT_VALUE: u64 = 256;

/// Coins awarded per achievement
pub const ACHIEVEMENT_COINS: u64 = 20;

/// Combo bonus per cascade pass
pub const COMBO_BONUS_PER_PASS: u64 = 50;

/// Occupied playable cells from which a column is flagged dangerous
pub const DANGER_THRESHOLD: u8 = 5;

/// Column the first slide starts from
pub const START_COLUMN: u8 = GRID_WIDTH / 2;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Delay before the first slide after `start`
pub const START_DELAY_MS: u32 = 500;

/// Idle delay before the next automatic slide
pub const NEXT_SLIDE_DELAY_MS: u32 = 100;

/// Delay between two cascade passes
pub const MERGE_PASS_DELAY_MS: u32 = 300;

/// Lifetime of a merge pop effect
pub const MERGE_EFFECT_MS: u32 = 500;

/// Lifetime of an achievement banner
pub const ACHIEVEMENT_EFFECT_MS: u32 = 3000;

/// Lifetime of a goal banner
pub const GOAL_EFFECT_MS: u32 = 4000;

/// Lifetime of a combo banner
pub const COMBO_EFFECT_MS: u32 = 2000;

/// Slide progress per millisecond at level 0 (0.001 per 60 FPS frame)
pub const BASE_SLIDE_SPEED_PER_MS: f32 = 0.00006;

/// Fall progress per millisecond (0.5 per 60 FPS frame)
pub const FALL_SPEED_PER_MS: f32 = 0.03;

/// Slide speed multiplier per level
pub const LEVEL_SPEED_FACTOR: f32 = 1.01;

/// Actions accepted by the engine's input sink
///
/// Used by the terminal key map and the remote adapter alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Start a slide toward (or redirect the sliding tile into) a column
    SelectColumn(u8),
    /// Pause or resume
    TogglePause,
    /// Reset the board, keeping best score and coins
    Restart,
    /// Leave the start screen
    Start,
}

impl GameAction {
    /// Parse action from string
    ///
    /// Column selection is written `selectColumn:<n>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use merge_drop_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("togglePause"), Some(GameAction::TogglePause));
    /// assert_eq!(GameAction::from_str("SELECTCOLUMN:0"), Some(GameAction::SelectColumn(0)));
    /// assert_eq!(GameAction::from_str("selectColumn"), None);
    /// assert_eq!(GameAction::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        if let Some(col) = lower.strip_prefix("selectcolumn:") {
            return col.trim().parse::<u8>().ok().map(GameAction::SelectColumn);
        }
        match lower.as_str() {
            "togglepause" | "pause" => Some(GameAction::TogglePause),
            "restart" => Some(GameAction::Restart),
            "start" => Some(GameAction::Start),
            _ => None,
        }
    }

    /// Convert to camelCase action name
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::SelectColumn(_) => "selectColumn",
            GameAction::TogglePause => "togglePause",
            GameAction::Restart => "restart",
            GameAction::Start => "start",
        }
    }
}

/// Top-level engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    AwaitingStart,
    Playing,
    Paused,
    GameOver,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::AwaitingStart => "awaitingStart",
            Lifecycle::Playing => "playing",
            Lifecycle::Paused => "paused",
            Lifecycle::GameOver => "gameOver",
        }
    }
}

/// Drop-resolve sub-cycle while playing
///
/// `Idle → Sliding → Falling → Resolving → Idle`. A slide that completes without a
/// redirect skips `Falling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    Idle,
    Sliding,
    Falling,
    Resolving,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Sliding => "sliding",
            CyclePhase::Falling => "falling",
            CyclePhase::Resolving => "resolving",
        }
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOverCause {
    /// A slide was started or redirected into a blocked column
    ColumnBlocked { column: u8 },
    /// A tile came to rest in the death row
    DeathRowLanding { column: u8 },
    /// Compaction after a merge pushed a tile into the death row
    GravityOverflow { column: u8 },
    /// No column could accept the next automatic slide
    NoDropColumn,
}

impl GameOverCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOverCause::ColumnBlocked { .. } => "columnBlocked",
            GameOverCause::DeathRowLanding { .. } => "deathRowLanding",
            GameOverCause::GravityOverflow { .. } => "gravityOverflow",
            GameOverCause::NoDropColumn => "noDropColumn",
        }
    }
}

/// Notifications delivered to engine observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A merge produced a value of at least [`ACHIEVEMENT_VALUE`]
    Achievement { value: u64 },
    /// A merge reached the current goal
    GoalAchieved {
        value: u64,
        new_goal: u64,
        removed: Option<u64>,
    },
    /// A cascade ran for more than one pass
    Combo { passes: u32, bonus: u64 },
    /// The game ended
    GameOver {
        final_score: u64,
        best_score: u64,
        cause: GameOverCause,
    },
    /// Saving the best score failed; gameplay continues
    PersistenceFailed { message: String },
}

impl GameEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameEvent::Achievement { .. } => "achievement",
            GameEvent::GoalAchieved { .. } => "goalAchieved",
            GameEvent::Combo { .. } => "combo",
            GameEvent::GameOver { .. } => "gameOver",
            GameEvent::PersistenceFailed { .. } => "persistenceFailed",
        }
    }
}

/// Transient visual states exposed to render sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Pop on the cell that received a merged value
    Merge { row: u8, column: u8, value: u64 },
    Achievement { value: u64 },
    Goal { value: u64, new_goal: u64 },
    Combo { passes: u32 },
}

impl EffectKind {
    /// Total lifetime of the effect in milliseconds
    pub fn duration_ms(&self) -> u32 {
        match self {
            EffectKind::Merge { .. } => MERGE_EFFECT_MS,
            EffectKind::Achievement { .. } => ACHIEVEMENT_EFFECT_MS,
            EffectKind::Goal { .. } => GOAL_EFFECT_MS,
            EffectKind::Combo { .. } => COMBO_EFFECT_MS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Merge { .. } => "merge",
            EffectKind::Achievement { .. } => "achievement",
            EffectKind::Goal { .. } => "goal",
            EffectKind::Combo { .. } => "combo",
        }
    }
}
