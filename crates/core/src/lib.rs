//! Core game logic module - pure, deterministic, and testable
//!
//! This crate holds the rules of the merge-drop puzzle. It has **zero
//! dependencies** on UI, networking, or I/O:
//!
//! - **Deterministic**: the same seed produces the same tile sequence
//! - **Testable**: every rule is exercised by unit tests
//! - **Allocation-free**: groups, queues, and reports live in fixed-capacity arrays
//!
//! # Module Structure
//!
//! - [`grid`]: 8x6 tile grid with column queries and gravity
//! - [`queue`]: weighted generator of the next three tile values
//! - [`progression`]: goal doubling, slide speed, and value-set rotation
//! - [`sliding`]: horizontal pre-placement slide of the incoming tile
//! - [`falling`]: vertical fall after a redirect
//! - [`merge`]: cascading connected-group merges
//! - [`scoring`]: score, combo, and coin rules
//! - [`rng`]: seeded LCG
//!
//! # Example
//!
//! ```
//! use merge_drop_core::{Grid, MergeResolver};
//!
//! let mut grid = Grid::new();
//! grid.set(7, 1, 4);
//! grid.set(7, 2, 4);
//! grid.set(7, 3, 4);
//!
//! let mut resolver = MergeResolver::new(0);
//! let passes = resolver.resolve_all(&mut grid);
//! assert_eq!(passes.len(), 1);
//! assert_eq!(passes[0].points, 48);
//! assert_eq!(grid.get(7, 1), Some(16));
//! ```

pub mod falling;
pub mod grid;
pub mod merge;
pub mod progression;
pub mod queue;
pub mod rng;
pub mod scoring;
pub mod sliding;

pub use merge_drop_types as types;

pub use falling::{ease_out_bounce, ColumnBlocked, DropController, FallingTile, Landing, TileStep};
pub use grid::{Grid, GRID_SIZE};
pub use merge::{find_groups, MergeGroup, MergeRecord, MergeResolver, PassReport};
pub use progression::{GoalOutcome, Progression, RotationPolicy};
pub use queue::TileQueue;
pub use rng::SimpleRng;
pub use scoring::{achievement_coins, combo_bonus, is_achievement, ScoreState};
pub use sliding::{SlidingController, SlidingTile};
