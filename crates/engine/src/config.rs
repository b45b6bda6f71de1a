//! Engine timing and rule settings

use merge_drop_core::RotationPolicy;
use merge_drop_types::{
    BASE_SLIDE_SPEED_PER_MS, FALL_SPEED_PER_MS, MERGE_PASS_DELAY_MS, NEXT_SLIDE_DELAY_MS,
    START_DELAY_MS,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Seed of the tile generator
    pub seed: u32,
    /// Slide progress per millisecond at level 0
    pub base_slide_speed: f32,
    /// Fall progress per millisecond
    pub fall_speed: f32,
    /// Pause between cascade passes
    pub pass_delay_ms: u32,
    /// Idle time before the next automatic slide
    pub next_slide_delay_ms: u32,
    /// Idle time between `start` and the first slide
    pub start_delay_ms: u32,
    pub rotation: RotationPolicy,
}

impl EngineConfig {
    /// Default timings with no delays; slides and falls still take time to travel
    pub fn headless() -> Self {
        Self {
            pass_delay_ms: 0,
            next_slide_delay_ms: 0,
            start_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            base_slide_speed: BASE_SLIDE_SPEED_PER_MS,
            fall_speed: FALL_SPEED_PER_MS,
            pass_delay_ms: MERGE_PASS_DELAY_MS,
            next_slide_delay_ms: NEXT_SLIDE_DELAY_MS,
            start_delay_ms: START_DELAY_MS,
            rotation: RotationPolicy::Capped,
        }
    }
}
