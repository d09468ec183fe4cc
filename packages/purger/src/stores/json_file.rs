//! JSON file ledger backend.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PurgeError, Result};
use crate::traits::store::LedgerStore;
use crate::types::ledger::LedgerState;

/// Ledger persisted as a single JSON document.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the ledger,
/// so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn decode(&self) -> std::result::Result<LedgerState, PurgeError> {
        let data = fs::read_to_string(&self.path).map_err(|e| PurgeError::CorruptLedger {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let raw = serde_json::from_str(&data).map_err(|e| PurgeError::CorruptLedger {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(LedgerState::from_value(raw))
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> LedgerState {
        if !self.path.exists() {
            return LedgerState::default();
        }
        match self.decode() {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding unreadable ledger: {}", e);
                LedgerState::default()
            }
        }
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(PurgeError::Ledger)?;
        }

        let data = serde_json::to_vec_pretty(state)
            .map_err(|e| PurgeError::Ledger(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(PurgeError::Ledger)?;
        file.write_all(&data).map_err(PurgeError::Ledger)?;
        file.sync_all().map_err(PurgeError::Ledger)?;
        drop(file);

        fs::rename(&temp, &self.path).map_err(PurgeError::Ledger)?;
        debug!("Ledger written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PurgeError::Ledger(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ledger::{JobEvent, INITIAL_FLOOR};
    use tempfile::tempdir;

    fn success(sequence_id: u64, subject: &str) -> JobEvent {
        JobEvent {
            sequence_id,
            subject_key: subject.into(),
            display_name: "Name".into(),
            success: true,
            bytes_written: 10,
            timestamp: "2025-01-01T00:00:00+00:00".into(),
            operator: "ops".into(),
        }
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::new(temp.path().join("state/purger_state.json"));
        assert_eq!(store.load(), LedgerState::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::new(temp.path().join("state/purger_state.json"));

        let mut state = LedgerState::default();
        state.apply_event(success(INITIAL_FLOOR, "56851"));
        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_garbage_bytes_load_as_default() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("purger_state.json");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x13, 0x37]).unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.load(), LedgerState::default());

        fs::write(&path, "{\"next_sequence_id\": 100").unwrap();
        assert_eq!(store.load(), LedgerState::default());
    }

    #[test]
    fn test_stale_temp_file_does_not_affect_load() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::new(temp.path().join("purger_state.json"));

        let mut state = LedgerState::default();
        state.apply_event(success(INITIAL_FLOOR + 4, "1"));
        store.save(&state).unwrap();

        // Simulates a crash after the temp file was half written.
        fs::write(store.temp_path(), "{\"next_seq").unwrap();
        assert_eq!(store.load(), state);

        state.apply_event(success(INITIAL_FLOOR + 5, "2"));
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_clear() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::new(temp.path().join("purger_state.json"));
        store.clear().unwrap();

        let mut state = LedgerState::default();
        state.apply_event(success(INITIAL_FLOOR, "1"));
        store.save(&state).unwrap();
        store.clear().unwrap();

        assert!(!store.path().exists());
        assert_eq!(store.load(), LedgerState::default());
    }
}
