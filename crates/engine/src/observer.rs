//! Collaborator seams: event observers, best-score persistence, score submission
//!
//! The engine owns all game state. Collaborators only see events and values
//! pushed to them; none of them can reach back into the engine.

use std::sync::{Arc, Mutex};

use merge_drop_types::GameEvent;

/// Receives engine notifications (achievements, goals, combos, game over)
pub trait GameObserver: Send {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> GameObserver for F
where
    F: FnMut(&GameEvent) + Send,
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Failure of a persistence or submission collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Storage for the single best-score scalar
pub trait BestScoreStore: Send {
    fn load(&mut self) -> Result<u64, StoreError>;
    fn save(&mut self, best_score: u64) -> Result<(), StoreError>;
}

/// Why a score was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionReason {
    GameOver,
    NewBest,
}

impl SubmissionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionReason::GameOver => "gameOver",
            SubmissionReason::NewBest => "newBest",
        }
    }
}

/// Payload handed to a [`ScoreSubmitter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreSubmission {
    pub score: u64,
    pub best_score: u64,
    pub level: u32,
    pub coins: u64,
    pub current_goal: u64,
    pub episode_id: u32,
    pub reason: SubmissionReason,
}

/// Leaderboard-style sink for finished scores
pub trait ScoreSubmitter: Send {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), StoreError>;
}

/// Observer that records every event; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<GameEvent> {
        let mut guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl GameObserver for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_log_clones_share_storage() {
        let log = EventLog::new();
        let mut sink = log.clone();
        sink.on_event(&GameEvent::Achievement { value: 256 });
        assert_eq!(log.events().len(), 1);
        assert_eq!(log.take(), vec![GameEvent::Achievement { value: 256 }]);
        assert!(log.events().is_empty());
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = 0u32;
        {
            let mut obs = |_: &GameEvent| seen += 1;
            obs.on_event(&GameEvent::Combo { passes: 2, bonus: 100 });
        }
        assert_eq!(seen, 1);
    }

    #[test]
    fn store_error_messages() {
        let err = StoreError::Corrupt("abc".into());
        assert_eq!(err.to_string(), "corrupt record: abc");
    }
}
