//! Scoring module - score, combo, and coin rules
//!
//! - A merge of `n` tiles of value `v` scores `v * 2^(n-1) * n` (see [`crate::merge`]).
//! - A cascade pass numbered `p >= 2` adds a combo bonus of `50 * p`.
//! - Every merged value of at least 256 awards 20 coins.

use crate::types::{ACHIEVEMENT_COINS, ACHIEVEMENT_VALUE, COMBO_BONUS_PER_PASS};

/// Running totals for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreState {
    pub score: u64,
    pub best_score: u64,
    pub coins: u64,
}

impl ScoreState {
    pub fn new(best_score: u64, coins: u64) -> Self {
        Self {
            score: 0,
            best_score,
            coins,
        }
    }

    pub fn add_points(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn add_coins(&mut self, coins: u64) {
        self.coins = self.coins.saturating_add(coins);
    }

    /// Raise the best score to the current score; true if it grew
    pub fn commit_best(&mut self) -> bool {
        if self.score > self.best_score {
            self.best_score = self.score;
            true
        } else {
            false
        }
    }
}

/// Combo bonus after cascade pass `pass` (1-based); the first pass earns nothing
pub fn combo_bonus(pass: u32) -> u64 {
    if pass <= 1 {
        return 0;
    }
    COMBO_BONUS_PER_PASS.saturating_mul(pass as u64)
}

/// Whether a merged value earns an achievement
pub fn is_achievement(value: u64) -> bool {
    value >= ACHIEVEMENT_VALUE
}

/// Coins awarded for a merged value
pub fn achievement_coins(value: u64) -> u64 {
    if is_achievement(value) {
        ACHIEVEMENT_COINS
    } else {
        0
    }
}
