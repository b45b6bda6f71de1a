//! Score submissions appended to a JSON Lines file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use merge_drop_engine::{ScoreSubmission, ScoreSubmitter, StoreError};

/// One line per submission.
#[derive(Debug, Clone)]
pub struct JsonlScoreLog {
    path: PathBuf,
}

#[derive(Serialize)]
struct SubmissionRecord {
    score: u64,
    best_score: u64,
    level: u32,
    coins: u64,
    current_goal: u64,
    episode_id: u32,
    reason: &'static str,
    ts: u64,
}

impl From<&ScoreSubmission> for SubmissionRecord {
    fn from(s: &ScoreSubmission) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        Self {
            score: s.score,
            best_score: s.best_score,
            level: s.level,
            coins: s.coins,
            current_goal: s.current_goal,
            episode_id: s.episode_id,
            reason: s.reason.as_str(),
            ts: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }
}

impl JsonlScoreLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreSubmitter for JsonlScoreLog {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&SubmissionRecord::from(submission))
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }
}
