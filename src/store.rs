//! File-backed best score.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use merge_drop_engine::{BestScoreStore, StoreError};

/// Best score kept as one decimal number in a text file.
///
/// A missing file reads as 0. Anything else that does not parse is reported as
/// [`StoreError::Corrupt`]; the engine treats that as 0 too.
#[derive(Debug, Clone)]
pub struct FileBestScoreStore {
    path: PathBuf,
}

impl FileBestScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BestScoreStore for FileBestScoreStore {
    fn load(&mut self) -> Result<u64, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed
            .parse::<u64>()
            .map_err(|_| StoreError::Corrupt(format!("{}: {trimmed:?}", self.path.display())))
    }

    fn save(&mut self, best_score: u64) -> Result<(), StoreError> {
        // Write a sibling file and rename so a crash never leaves half a number.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, format!("{best_score}\n"))?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBestScoreStore::new(dir.path().join("best.txt"));
        assert_eq!(store.load().unwrap(), 0);
    }

    #[test]
    fn saved_value_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.txt");
        let mut store = FileBestScoreStore::new(&path);
        store.save(1234).unwrap();
        assert_eq!(FileBestScoreStore::new(&path).load().unwrap(), 1234);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1234\n");
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.txt");
        fs::write(&path, "lots").unwrap();
        let err = FileBestScoreStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn unwritable_location_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBestScoreStore::new(dir.path().join("missing").join("best.txt"));
        assert!(matches!(store.save(5), Err(StoreError::Io(_))));
    }
}
