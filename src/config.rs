//! Application settings from `MERGE_DROP_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use merge_drop_core::RotationPolicy;
use merge_drop_engine::EngineConfig;

/// Default best-score file, relative to the working directory
pub const DEFAULT_BEST_SCORE_PATH: &str = "merge-drop-best.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Tile generator seed; time-derived when unset
    pub seed: Option<u32>,
    pub best_score_path: PathBuf,
    /// Append score submissions as JSON lines
    pub score_log_path: Option<PathBuf>,
    /// Write tracing output to this file
    pub log_path: Option<PathBuf>,
    pub rotation: RotationPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: None,
            best_score_path: PathBuf::from(DEFAULT_BEST_SCORE_PATH),
            score_log_path: None,
            log_path: None,
            rotation: RotationPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Read the process environment; unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let defaults = Self::default();

        Self {
            seed: non_empty("MERGE_DROP_SEED").and_then(|s| s.parse().ok()),
            best_score_path: non_empty("MERGE_DROP_BEST_SCORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.best_score_path),
            score_log_path: non_empty("MERGE_DROP_SCORE_LOG_PATH").map(PathBuf::from),
            log_path: non_empty("MERGE_DROP_LOG_PATH").map(PathBuf::from),
            rotation: non_empty("MERGE_DROP_ROTATION")
                .and_then(|s| RotationPolicy::from_str(&s))
                .unwrap_or(defaults.rotation),
        }
    }

    /// Configured seed, or one derived from the clock
    pub fn resolve_seed(&self) -> u32 {
        self.seed.unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos();
            nanos.max(1)
        })
    }

    /// Engine settings for interactive play
    pub fn engine_config(&self, seed: u32) -> EngineConfig {
        EngineConfig::default()
            .with_seed(seed)
            .with_rotation(self.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(AppConfig::from_lookup(|_| None), AppConfig::default());
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MERGE_DROP_SEED", " 42 "),
            ("MERGE_DROP_BEST_SCORE_PATH", "/tmp/best.txt"),
            ("MERGE_DROP_SCORE_LOG_PATH", "scores.jsonl"),
            ("MERGE_DROP_ROTATION", "geometric"),
        ]));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.resolve_seed(), 42);
        assert_eq!(config.best_score_path, PathBuf::from("/tmp/best.txt"));
        assert_eq!(config.score_log_path, Some(PathBuf::from("scores.jsonl")));
        assert_eq!(config.rotation, RotationPolicy::Geometric);
        assert_eq!(config.engine_config(42).rotation, RotationPolicy::Geometric);
    }

    #[test]
    fn bad_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MERGE_DROP_SEED", "abc"),
            ("MERGE_DROP_ROTATION", "spiral"),
            ("MERGE_DROP_LOG_PATH", "   "),
        ]));
        assert_eq!(config.seed, None);
        assert_eq!(config.rotation, RotationPolicy::Capped);
        assert_eq!(config.log_path, None);
    }
}
