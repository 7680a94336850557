//! `installed.json`: the record of what's installed where. Writes are
//! atomic (temp file + rename, via `fsutil::atomic_write`) and the whole
//! read-modify-write cycle is guarded by an exclusive file lock so
//! concurrent `install`/`uninstall` invocations can't interleave and
//! corrupt the file.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub version: String,
    pub absolute_path: PathBuf,
    pub installed_at: chrono::DateTime<chrono::Utc>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalledState {
    pub components: HashMap<String, InstalledRecord>,
}

/// Guards `installed.json` (or its lock sibling) against concurrent
/// `install`/`uninstall` invocations. Each operation acquires the lock for
/// exactly as long as it needs it, within one method call; the lock is
/// never held across a method boundary, so there is no self-referential
/// guard to store and no need for `unsafe`.
pub struct StateLock {
    lock: fd_lock::RwLock<std::fs::File>,
    path: PathBuf,
}

impl StateLock {
    pub fn acquire(state_path: &Path) -> Result<Self> {
        if let Some(parent) = state_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_path = state_path.with_extension("json.lock");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        Ok(Self {
            lock: fd_lock::RwLock::new(file),
            path: state_path.to_path_buf(),
        })
    }

    pub fn load(&mut self) -> Result<InstalledState> {
        let _guard = self.lock.write()?;
        self.load_locked()
    }

    pub fn save(&mut self, state: &InstalledState) -> Result<()> {
        let _guard = self.lock.write()?;
        self.save_locked(state)
    }

    /// Acquires the lock once, loads the current state, lets `f` read or
    /// mutate it, then persists the result — all inside a single critical
    /// section, so no other process can interleave a write between the load
    /// and the save.
    pub fn with_locked<T>(&mut self, f: impl FnOnce(&mut InstalledState) -> Result<T>) -> Result<T> {
        let _guard = self.lock.write()?;
        let mut state = self.load_locked()?;
        let result = f(&mut state)?;
        self.save_locked(&state)?;
        Ok(result)
    }

    fn load_locked(&self) -> Result<InstalledState> {
        if !self.path.exists() {
            return Ok(InstalledState::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_locked(&self, state: &InstalledState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        crate::fsutil::atomic_write(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("installed.json");
        let mut lock = StateLock::acquire(&state_path).unwrap();
        let state = lock.load().unwrap();
        assert!(state.components.is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("installed.json");
        let mut lock = StateLock::acquire(&state_path).unwrap();

        let mut state = InstalledState::default();
        state.components.insert(
            "ffmpeg".to_string(),
            InstalledRecord {
                version: "6.0".to_string(),
                absolute_path: dir.path().join("bin/ffmpeg"),
                installed_at: chrono::Utc::now(),
                size_bytes: 1024,
            },
        );
        lock.save(&state).unwrap();

        let reloaded = lock.load().unwrap();
        assert!(reloaded.components.contains_key("ffmpeg"));
    }

    #[test]
    fn test_with_locked_persists_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("installed.json");
        let mut lock = StateLock::acquire(&state_path).unwrap();

        lock.with_locked(|state| {
            state.components.insert(
                "ffmpeg".to_string(),
                InstalledRecord {
                    version: "6.0".to_string(),
                    absolute_path: dir.path().join("bin/ffmpeg"),
                    installed_at: chrono::Utc::now(),
                    size_bytes: 1024,
                },
            );
            Ok(())
        })
        .unwrap();

        let reloaded = lock.load().unwrap();
        assert!(reloaded.components.contains_key("ffmpeg"));
    }
}
