//! Progression - goal threshold, active value set, and slide speed
//!
//! Every time a merge reaches the current goal, the goal doubles and the slide
//! speed grows by 1% per level, where `level = log2(goal / 512)`.
//!
//! Some goal tiers rotate the active value set: the smallest value leaves play
//! (queue and grid) and a new top value joins.
//!
//! | New goal | Removed | Added |
//! |----------|---------|-------|
//! | 2048 | 2 | 128 |
//! | 4096 | 4 | 256 |
//! | 8192 | 8 | 512 |
//!
//! Past 8192, [`RotationPolicy`] decides whether rotation continues.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::queue::TileQueue;
use crate::types::{
    BASE_SLIDE_SPEED_PER_MS, INITIAL_GOAL, INITIAL_VALUES, LEVEL_SPEED_FACTOR, MAX_ACTIVE_VALUES,
};

/// Fixed rotation tiers: (goal, removed value, added value)
const ROTATIONS: [(u64, u64, u64); 3] = [(2048, 2, 128), (4096, 4, 256), (8192, 8, 512)];

/// What happens to the value set once the goal passes 8192
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RotationPolicy {
    /// Only the three fixed tiers rotate; later goals only double
    #[default]
    Capped,
    /// Every further doubling drops the smallest value and adds twice the largest
    Geometric,
}

impl RotationPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "capped" => Some(RotationPolicy::Capped),
            "geometric" => Some(RotationPolicy::Geometric),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RotationPolicy::Capped => "capped",
            RotationPolicy::Geometric => "geometric",
        }
    }
}

/// Result of one goal achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalOutcome {
    /// Merged value that reached the goal
    pub value: u64,
    /// Goal after doubling
    pub new_goal: u64,
    /// Value rotated out of play, if any
    pub removed: Option<u64>,
    /// Value rotated into play, if any
    pub added: Option<u64>,
    /// Tiles cleared from the grid by the rotation
    pub cleared_tiles: usize,
    /// First column whose gravity pass overflowed into the death row
    pub overflow_column: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct Progression {
    current_goal: u64,
    available: ArrayVec<u64, MAX_ACTIVE_VALUES>,
    base_speed: f32,
    policy: RotationPolicy,
}

impl Progression {
    pub fn new(base_speed: f32, policy: RotationPolicy) -> Self {
        Self {
            current_goal: INITIAL_GOAL,
            available: INITIAL_VALUES.iter().copied().collect(),
            base_speed,
            policy,
        }
    }

    /// Back to the opening goal and value set
    pub fn reset(&mut self) {
        self.current_goal = INITIAL_GOAL;
        self.available = INITIAL_VALUES.iter().copied().collect();
    }

    pub fn current_goal(&self) -> u64 {
        self.current_goal
    }

    pub fn available(&self) -> &[u64] {
        &self.available
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// `log2(goal / 512)`
    pub fn level(&self) -> u32 {
        (self.current_goal / INITIAL_GOAL).max(1).trailing_zeros()
    }

    /// Slide progress per millisecond at the current level
    pub fn slide_speed(&self) -> f32 {
        self.base_speed * LEVEL_SPEED_FACTOR.powi(self.level() as i32)
    }

    /// Whether `value` meets the current goal
    pub fn reaches_goal(&self, value: u64) -> bool {
        value >= self.current_goal
    }

    /// Double the goal and apply any rotation tied to the new goal
    ///
    /// A rotation purges the removed value from the queue and the grid, then runs
    /// gravity over every column.
    pub fn on_goal_achieved(&mut self, value: u64, grid: &mut Grid, queue: &mut TileQueue) -> GoalOutcome {
        self.current_goal = self.current_goal.saturating_mul(2);

        let mut outcome = GoalOutcome {
            value,
            new_goal: self.current_goal,
            removed: None,
            added: None,
            cleared_tiles: 0,
            overflow_column: None,
        };

        if let Some((removed, added)) = self.rotation_for(self.current_goal) {
            self.available.retain(|v| *v != removed);
            if !self.available.contains(&added) && !self.available.is_full() {
                self.available.push(added);
            }
            self.available.sort_unstable();

            queue.set_available(&self.available);
            queue.purge(removed);

            outcome.cleared_tiles = grid.clear_value(removed);
            outcome.overflow_column = grid.compact_all();
            outcome.removed = Some(removed);
            outcome.added = Some(added);
        }

        outcome
    }

    fn rotation_for(&self, goal: u64) -> Option<(u64, u64)> {
        if let Some(&(_, removed, added)) = ROTATIONS.iter().find(|(g, _, _)| *g == goal) {
            return Some((removed, added));
        }
        match self.policy {
            RotationPolicy::Capped => None,
            RotationPolicy::Geometric => {
                let last_fixed = ROTATIONS[ROTATIONS.len() - 1].0;
                if goal <= last_fixed {
                    return None;
                }
                let lowest = *self.available.first()?;
                let highest = *self.available.last()?;
                Some((lowest, highest.saturating_mul(2)))
            }
        }
    }
}

impl Default for Progression {
    fn default() -> Self {
        Self::new(BASE_SLIDE_SPEED_PER_MS, RotationPolicy::Capped)
    }
}
