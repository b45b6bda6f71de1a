//! Tile queue - weighted generator of upcoming tile values
//!
//! The queue always holds [`QUEUE_LEN`] values. Fresh values are drawn from the
//! active value set with weights favouring small tiles: with `n` active values the
//! value at ordinal `i` (0 = smallest) has weight `n - i + 1`.

use arrayvec::ArrayVec;

use crate::rng::SimpleRng;
use crate::types::{INITIAL_QUEUE, INITIAL_VALUES, MAX_ACTIVE_VALUES, QUEUE_LEN};

#[derive(Debug, Clone)]
pub struct TileQueue {
    queue: ArrayVec<u64, QUEUE_LEN>,
    available: ArrayVec<u64, MAX_ACTIVE_VALUES>,
    weights: ArrayVec<u32, MAX_ACTIVE_VALUES>,
    rng: SimpleRng,
}

impl TileQueue {
    /// Queue seeded with the opening tiles and the opening value set
    pub fn new(seed: u32) -> Self {
        let mut queue = Self {
            queue: ArrayVec::new(),
            available: ArrayVec::new(),
            weights: ArrayVec::new(),
            rng: SimpleRng::new(seed),
        };
        queue.set_available(&INITIAL_VALUES);
        queue.queue.extend(INITIAL_QUEUE);
        queue
    }

    /// Next `n` values, front first, without consuming them
    pub fn peek(&self, n: usize) -> &[u64] {
        &self.queue[..n.min(self.queue.len())]
    }

    /// Full queue contents, front first
    pub fn as_slice(&self) -> &[u64] {
        &self.queue
    }

    /// Remove the front value and append a fresh one
    pub fn pop(&mut self) -> u64 {
        let value = if self.queue.is_empty() {
            self.generate()
        } else {
            self.queue.remove(0)
        };
        self.fill();
        value
    }

    /// Drop every queued `value` and backfill with fresh draws
    ///
    /// Returns how many entries were removed.
    pub fn purge(&mut self, value: u64) -> usize {
        let before = self.queue.len();
        self.queue.retain(|v| *v != value);
        let removed = before - self.queue.len();
        self.fill();
        removed
    }

    /// Overwrite the upcoming values (puzzle setups); missing entries are drawn fresh
    pub fn set_contents(&mut self, values: &[u64]) {
        self.queue.clear();
        self.queue.extend(values.iter().copied().take(QUEUE_LEN));
        self.fill();
    }

    /// Replace the active value set and recompute weights
    ///
    /// Values beyond the capacity of the set are ignored.
    pub fn set_available(&mut self, values: &[u64]) {
        self.available.clear();
        for &v in values.iter().take(MAX_ACTIVE_VALUES) {
            self.available.push(v);
        }

        let count = self.available.len() as u32;
        self.weights.clear();
        for i in 0..count {
            self.weights.push(count - i + 1);
        }
    }

    /// Active value set, smallest first
    pub fn available(&self) -> &[u64] {
        &self.available
    }

    /// Current draw weights, parallel to [`available`](Self::available)
    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    /// Current RNG state (used to seed the next game)
    pub fn seed(&self) -> u32 {
        self.rng.state()
    }

    fn fill(&mut self) {
        while self.queue.len() < QUEUE_LEN {
            let v = self.generate();
            self.queue.push(v);
        }
    }

    fn generate(&mut self) -> u64 {
        match self.rng.weighted_index(&self.weights) {
            Some(i) => self.available[i],
            None => INITIAL_VALUES[0],
        }
    }
}

impl Default for TileQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
