//! Game engine - sequences slide, fall, merge, and progression
//!
//! The engine is a single-threaded state machine driven by [`GameEngine::advance`].
//! Lifecycle: `AwaitingStart → Playing ⇄ Paused`, `Playing → GameOver`, and
//! `restart` from anywhere back to `AwaitingStart`.
//!
//! While playing, each tile goes through `Idle → Sliding → (Falling) → Resolving → Idle`:
//!
//! - **Idle**: waits out the auto-slide delay, then slides the next tile toward the
//!   last drop column (or the first open column).
//! - **Sliding**: the tile travels along row 0. Selecting a column redirects it
//!   into a fall; otherwise it lands in its target column when the slide completes.
//! - **Falling**: fast vertical drop into the selected column.
//! - **Resolving**: cascade passes separated by the pass delay. The first pass runs
//!   in the same tick as the landing.
//!
//! Pausing stops every timer, including the pending delays, which resume with the
//! remaining time.

use std::fmt;

use arrayvec::ArrayVec;
use tracing::{debug, info, warn};

use merge_drop_core::{
    achievement_coins, combo_bonus, is_achievement, ColumnBlocked, DropController, FallingTile,
    Grid, Landing, MergeResolver, Progression, ScoreState, SlidingController, SlidingTile,
    TileQueue, TileStep,
};
use merge_drop_types::{
    CyclePhase, EffectKind, GameAction, GameEvent, GameOverCause, Lifecycle, GRID_WIDTH, QUEUE_LEN,
    START_COLUMN, STARTING_COINS,
};

use crate::config::EngineConfig;
use crate::observer::{
    BestScoreStore, GameObserver, ScoreSubmission, ScoreSubmitter, SubmissionReason,
};
use crate::snapshot::{EffectSnapshot, FallingSnapshot, GameSnapshot, SlidingSnapshot, MAX_EFFECTS};

pub struct GameEngine {
    config: EngineConfig,
    grid: Grid,
    queue: TileQueue,
    progression: Progression,
    sliding: SlidingController,
    drop: DropController,
    resolver: MergeResolver,
    scores: ScoreState,
    lifecycle: Lifecycle,
    phase: CyclePhase,
    /// Idle time left before the next automatic slide.
    idle_delay_ms: u32,
    last_drop_column: u8,
    dangerous: [bool; GRID_WIDTH as usize],
    effects: ArrayVec<EffectSnapshot, MAX_EFFECTS>,
    game_over_cause: Option<GameOverCause>,
    /// Monotonic episode id (increments on restart).
    episode_id: u32,
    /// Tiles put into play this episode.
    tile_id: u32,
    observers: Vec<Box<dyn GameObserver>>,
    store: Option<Box<dyn BestScoreStore>>,
    submitter: Option<Box<dyn ScoreSubmitter>>,
}

impl GameEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            grid: Grid::new(),
            queue: TileQueue::new(config.seed),
            progression: Progression::new(config.base_slide_speed, config.rotation),
            sliding: SlidingController::new(),
            drop: DropController::new(config.fall_speed),
            resolver: MergeResolver::new(config.pass_delay_ms),
            scores: ScoreState::new(0, STARTING_COINS),
            lifecycle: Lifecycle::AwaitingStart,
            phase: CyclePhase::Idle,
            idle_delay_ms: 0,
            last_drop_column: START_COLUMN,
            dangerous: [false; GRID_WIDTH as usize],
            effects: ArrayVec::new(),
            game_over_cause: None,
            episode_id: 0,
            tile_id: 0,
            observers: Vec::new(),
            store: None,
            submitter: None,
            config,
        }
    }

    /// Attach best-score storage and load the stored value
    ///
    /// A failed load counts as a best score of 0.
    pub fn set_best_score_store(&mut self, mut store: Box<dyn BestScoreStore>) {
        self.scores.best_score = match store.load() {
            Ok(best) => best,
            Err(err) => {
                warn!(error = %err, "failed to load best score, starting from 0");
                0
            }
        };
        self.store = Some(store);
    }

    pub fn set_score_submitter(&mut self, submitter: Box<dyn ScoreSubmitter>) {
        self.submitter = Some(submitter);
    }

    pub fn subscribe(&mut self, observer: Box<dyn GameObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u64 {
        self.scores.score
    }

    pub fn best_score(&self) -> u64 {
        self.scores.best_score
    }

    pub fn coins(&self) -> u64 {
        self.scores.coins
    }

    pub fn current_goal(&self) -> u64 {
        self.progression.current_goal()
    }

    pub fn level(&self) -> u32 {
        self.progression.level()
    }

    pub fn slide_speed(&self) -> f32 {
        self.progression.slide_speed()
    }

    pub fn available_values(&self) -> &[u64] {
        self.progression.available()
    }

    pub fn next_queue(&self) -> &[u64] {
        self.queue.as_slice()
    }

    pub fn sliding_tile(&self) -> Option<&SlidingTile> {
        self.sliding.tile()
    }

    pub fn falling_tile(&self) -> Option<&FallingTile> {
        self.drop.tile()
    }

    pub fn dangerous_columns(&self) -> [bool; GRID_WIDTH as usize] {
        self.dangerous
    }

    pub fn effects(&self) -> &[EffectSnapshot] {
        &self.effects
    }

    pub fn last_drop_column(&self) -> u8 {
        self.last_drop_column
    }

    pub fn pass_count(&self) -> u32 {
        self.resolver.pass_count()
    }

    pub fn game_over_cause(&self) -> Option<GameOverCause> {
        self.game_over_cause
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn tile_id(&self) -> u32 {
        self.tile_id
    }

    pub fn seed(&self) -> u32 {
        self.queue.seed()
    }

    /// Whether a column selection would be acted on right now
    pub fn accepts_selection(&self) -> bool {
        self.lifecycle == Lifecycle::Playing
            && matches!(self.phase, CyclePhase::Idle | CyclePhase::Sliding)
    }

    /// Replace the grid (puzzle setups and replays)
    pub fn set_grid(&mut self, grid: Grid) {
        self.grid = grid;
        self.dangerous = self.grid.dangerous_columns();
    }

    /// Overwrite the upcoming tile values, front first
    pub fn set_upcoming(&mut self, values: &[u64]) {
        self.queue.set_contents(values);
    }

    /// Leave the start screen; the first slide follows after the start delay
    pub fn start(&mut self) -> bool {
        if self.lifecycle != Lifecycle::AwaitingStart {
            return false;
        }
        self.lifecycle = Lifecycle::Playing;
        self.phase = CyclePhase::Idle;
        self.idle_delay_ms = self.config.start_delay_ms;
        info!(episode_id = self.episode_id, seed = self.queue.seed(), "game started");
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.lifecycle {
            Lifecycle::Playing => {
                self.lifecycle = Lifecycle::Paused;
                debug!("paused");
                true
            }
            Lifecycle::Paused => {
                self.lifecycle = Lifecycle::Playing;
                debug!("resumed");
                true
            }
            Lifecycle::AwaitingStart | Lifecycle::GameOver => false,
        }
    }

    /// Reset the board for a new game; best score and coins carry over
    pub fn restart(&mut self) {
        let seed = self.queue.seed();
        self.grid.clear();
        self.queue = TileQueue::new(seed);
        self.progression.reset();
        self.sliding.clear();
        self.drop.clear();
        self.resolver.reset();
        self.scores.score = 0;
        self.lifecycle = Lifecycle::AwaitingStart;
        self.phase = CyclePhase::Idle;
        self.idle_delay_ms = 0;
        self.last_drop_column = START_COLUMN;
        self.dangerous = [false; GRID_WIDTH as usize];
        self.effects.clear();
        self.game_over_cause = None;
        self.episode_id = self.episode_id.wrapping_add(1);
        self.tile_id = 0;
        debug!(episode_id = self.episode_id, "restarted");
    }

    /// Start a slide toward `column` (Idle) or redirect the sliding tile into it
    ///
    /// Ignored outside `Playing`, while falling or resolving, and for out-of-range
    /// columns. A blocked column ends the game.
    pub fn select_column(&mut self, column: u8) -> bool {
        if self.lifecycle != Lifecycle::Playing || column >= GRID_WIDTH {
            return false;
        }

        match self.phase {
            CyclePhase::Idle => {
                self.start_slide(column);
                true
            }
            CyclePhase::Sliding => match self.sliding.redirect(&self.grid, column, &mut self.drop) {
                Ok(Some(tile)) => {
                    self.phase = CyclePhase::Falling;
                    debug!(value = tile.value, column, target_row = tile.target_row, "redirected");
                    true
                }
                Ok(None) => false,
                Err(ColumnBlocked { column }) => {
                    self.game_over(GameOverCause::ColumnBlocked { column });
                    true
                }
            },
            CyclePhase::Falling | CyclePhase::Resolving => false,
        }
    }

    /// Apply an input-sink action; returns whether anything changed
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::SelectColumn(column) => self.select_column(column),
            GameAction::TogglePause => self.toggle_pause(),
            GameAction::Restart => {
                self.restart();
                true
            }
            GameAction::Start => self.start(),
        }
    }

    /// Advance the simulation by `elapsed_ms`; returns whether anything changed
    pub fn advance(&mut self, elapsed_ms: u32) -> bool {
        if self.lifecycle != Lifecycle::Playing {
            return false;
        }

        let had_effects = !self.effects.is_empty();
        self.decay_effects(elapsed_ms);

        let changed = match self.phase {
            CyclePhase::Idle => {
                if self.idle_delay_ms > elapsed_ms {
                    self.idle_delay_ms -= elapsed_ms;
                    false
                } else {
                    self.idle_delay_ms = 0;
                    self.auto_slide();
                    true
                }
            }
            CyclePhase::Sliding => {
                let speed = self.progression.slide_speed();
                let step = self
                    .sliding
                    .advance(elapsed_ms as f32, speed, &mut self.grid);
                self.handle_step(step)
            }
            CyclePhase::Falling => {
                let step = self.drop.advance(elapsed_ms as f32, &mut self.grid);
                self.handle_step(step)
            }
            CyclePhase::Resolving => {
                if self.resolver.tick(elapsed_ms) {
                    self.merge_pass();
                    true
                } else {
                    false
                }
            }
        };

        changed || had_effects
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        out.grid = self.grid.rows();
        out.sliding = self.sliding.tile().copied().map(SlidingSnapshot::from);
        out.falling = self.drop.tile().copied().map(FallingSnapshot::from);
        out.effects.clear();
        out.effects.extend(self.effects.iter().copied());
        out.dangerous_columns = self.dangerous;
        out.score = self.scores.score;
        out.best_score = self.scores.best_score;
        out.coins = self.scores.coins;
        out.current_goal = self.progression.current_goal();
        out.level = self.progression.level();
        out.slide_speed = self.progression.slide_speed();
        out.available_values.clear();
        out.available_values
            .extend(self.progression.available().iter().copied());
        out.next_queue = [0; QUEUE_LEN];
        for (slot, value) in out.next_queue.iter_mut().zip(self.queue.as_slice()) {
            *slot = *value;
        }
        out.lifecycle = self.lifecycle;
        out.phase = self.phase;
        out.game_over_cause = self.game_over_cause;
        out.last_drop_column = self.last_drop_column;
        out.pass_count = self.resolver.pass_count();
        out.episode_id = self.episode_id;
        out.tile_id = self.tile_id;
        out.seed = self.queue.seed();
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    fn auto_slide(&mut self) {
        let target = if self.grid.is_column_drop_ready(self.last_drop_column) {
            self.last_drop_column
        } else {
            match self.grid.drop_ready_columns().first().copied() {
                Some(column) => column,
                None => {
                    self.game_over(GameOverCause::NoDropColumn);
                    return;
                }
            }
        };
        self.start_slide(target);
    }

    fn start_slide(&mut self, target: u8) {
        match self
            .sliding
            .start(&self.grid, &mut self.queue, self.last_drop_column, target)
        {
            Ok(tile) => {
                self.tile_id = self.tile_id.wrapping_add(1);
                self.phase = CyclePhase::Sliding;
                self.idle_delay_ms = 0;
                debug!(
                    value = tile.value,
                    from = tile.source_column,
                    to = tile.target_column,
                    tile_id = self.tile_id,
                    "slide started"
                );
            }
            Err(ColumnBlocked { column }) => {
                self.game_over(GameOverCause::ColumnBlocked { column });
            }
        }
    }

    fn handle_step(&mut self, step: TileStep) -> bool {
        match step {
            TileStep::Idle => false,
            TileStep::InFlight => true,
            TileStep::Landed(landing) => {
                self.on_landing(landing);
                true
            }
            TileStep::DeathRow { column } => {
                self.game_over(GameOverCause::DeathRowLanding { column });
                true
            }
        }
    }

    fn on_landing(&mut self, landing: Landing) {
        debug!(
            value = landing.value,
            row = landing.row,
            column = landing.column,
            "tile landed"
        );
        self.last_drop_column = landing.column;
        self.dangerous = self.grid.dangerous_columns();
        self.phase = CyclePhase::Resolving;
        self.resolver.begin();
        self.merge_pass();
    }

    fn merge_pass(&mut self) {
        let report = self.resolver.run_pass(&mut self.grid);
        if report.is_settled() {
            self.settle();
            return;
        }

        self.scores.add_points(report.points);
        for record in &report.merges {
            self.push_effect(EffectKind::Merge {
                row: record.row,
                column: record.column,
                value: record.value,
            });
            if is_achievement(record.value) {
                self.scores.add_coins(achievement_coins(record.value));
                self.push_effect(EffectKind::Achievement {
                    value: record.value,
                });
                self.emit(GameEvent::Achievement {
                    value: record.value,
                });
            }
        }

        if let Some(column) = report.overflow_column {
            self.game_over(GameOverCause::GravityOverflow { column });
            return;
        }

        for record in &report.merges {
            if !self.progression.reaches_goal(record.value) {
                continue;
            }
            let outcome =
                self.progression
                    .on_goal_achieved(record.value, &mut self.grid, &mut self.queue);
            info!(
                value = outcome.value,
                new_goal = outcome.new_goal,
                removed = ?outcome.removed,
                added = ?outcome.added,
                "goal reached"
            );
            self.push_effect(EffectKind::Goal {
                value: outcome.value,
                new_goal: outcome.new_goal,
            });
            self.emit(GameEvent::GoalAchieved {
                value: outcome.value,
                new_goal: outcome.new_goal,
                removed: outcome.removed,
            });
            if let Some(column) = outcome.overflow_column {
                self.game_over(GameOverCause::GravityOverflow { column });
                return;
            }
        }

        if report.pass > 1 {
            let bonus = combo_bonus(report.pass);
            self.scores.add_points(bonus);
            self.push_effect(EffectKind::Combo {
                passes: report.pass,
            });
            self.emit(GameEvent::Combo {
                passes: report.pass,
                bonus,
            });
        }

        self.dangerous = self.grid.dangerous_columns();
    }

    fn settle(&mut self) {
        self.dangerous = self.grid.dangerous_columns();
        self.phase = CyclePhase::Idle;
        self.idle_delay_ms = self.config.next_slide_delay_ms;
        debug!(passes = self.resolver.pass_count(), score = self.scores.score, "settled");
    }

    fn game_over(&mut self, cause: GameOverCause) {
        if self.lifecycle == Lifecycle::GameOver {
            return;
        }

        self.lifecycle = Lifecycle::GameOver;
        self.phase = CyclePhase::Idle;
        self.sliding.clear();
        self.drop.clear();
        self.resolver.reset();
        self.idle_delay_ms = 0;
        self.game_over_cause = Some(cause);

        let improved = self.scores.commit_best();
        info!(
            score = self.scores.score,
            best_score = self.scores.best_score,
            cause = cause.as_str(),
            "game over"
        );

        if improved {
            self.persist_best();
        }
        self.submit(SubmissionReason::GameOver);
        if improved {
            self.submit(SubmissionReason::NewBest);
        }

        self.emit(GameEvent::GameOver {
            final_score: self.scores.score,
            best_score: self.scores.best_score,
            cause,
        });
    }

    fn persist_best(&mut self) {
        let best = self.scores.best_score;
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(err) = store.save(best) {
            warn!(error = %err, best, "failed to save best score");
            self.emit(GameEvent::PersistenceFailed {
                message: err.to_string(),
            });
        }
    }

    fn submit(&mut self, reason: SubmissionReason) {
        let submission = ScoreSubmission {
            score: self.scores.score,
            best_score: self.scores.best_score,
            level: self.progression.level(),
            coins: self.scores.coins,
            current_goal: self.progression.current_goal(),
            episode_id: self.episode_id,
            reason,
        };
        let Some(submitter) = self.submitter.as_mut() else {
            return;
        };
        if let Err(err) = submitter.submit(&submission) {
            warn!(error = %err, reason = reason.as_str(), "score submission failed");
        }
    }

    fn emit(&mut self, event: GameEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }

    fn push_effect(&mut self, kind: EffectKind) {
        if self.effects.is_full() {
            self.effects.remove(0);
        }
        self.effects.push(EffectSnapshot::new(kind));
    }

    fn decay_effects(&mut self, elapsed_ms: u32) {
        for effect in self.effects.iter_mut() {
            effect.remaining_ms = effect.remaining_ms.saturating_sub(elapsed_ms);
        }
        self.effects.retain(|e| e.remaining_ms > 0);
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("lifecycle", &self.lifecycle)
            .field("phase", &self.phase)
            .field("score", &self.scores)
            .field("goal", &self.progression.current_goal())
            .field("episode_id", &self.episode_id)
            .field("tile_id", &self.tile_id)
            .finish_non_exhaustive()
    }
}
