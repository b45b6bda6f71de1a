//! Game engine crate - the orchestrator and its collaborator seams
//!
//! [`GameEngine`] owns every piece of game state and exposes three narrow surfaces:
//!
//! - an **input sink** ([`GameEngine::apply_action`]),
//! - a **render sink** ([`GameEngine::snapshot_into`] / [`GameSnapshot`]),
//! - **collaborators** for events, best-score persistence, and score submission
//!   ([`GameObserver`], [`BestScoreStore`], [`ScoreSubmitter`]).
//!
//! # Example
//!
//! ```
//! use merge_drop_engine::{EngineConfig, EventLog, GameEngine};
//! use merge_drop_types::{GameAction, Lifecycle};
//!
//! let mut engine = GameEngine::new(EngineConfig::headless().with_seed(7));
//! let log = EventLog::new();
//! engine.subscribe(Box::new(log.clone()));
//!
//! engine.apply_action(GameAction::Start);
//! engine.apply_action(GameAction::SelectColumn(2));
//! engine.apply_action(GameAction::SelectColumn(2));
//! for _ in 0..3 {
//!     engine.advance(16);
//! }
//!
//! assert_eq!(engine.lifecycle(), Lifecycle::Playing);
//! assert_eq!(engine.grid().get(7, 2), Some(2));
//! assert!(log.events().is_empty());
//! ```

pub mod config;
pub mod game;
pub mod observer;
pub mod snapshot;

pub use config::EngineConfig;
pub use game::GameEngine;
pub use observer::{
    BestScoreStore, EventLog, GameObserver, ScoreSubmission, ScoreSubmitter, StoreError,
    SubmissionReason,
};
pub use snapshot::{
    EffectSnapshot, FallingSnapshot, Fnv1aHasher, GameSnapshot, SlidingSnapshot, MAX_EFFECTS,
};
