//! The state ledger: sequence allocation, event recording, and queries.
//!
//! Every read-modify-write runs under one in-process mutex. There is no
//! cross-process lock: two separately launched purgers sharing a ledger file
//! can both preview the same sequence id.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::Result;
use crate::stores::JsonFileStore;
use crate::traits::store::LedgerStore;
use crate::types::ledger::{JobEvent, LedgerState, SubjectRecord};

/// Next sequence slot plus the cumulative completion count, as previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub sequence_id: u64,
    pub completed_count: u64,
}

/// Durable source of truth for counters, client records and history.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    lock: Mutex<()>,
}

impl Ledger<JsonFileStore> {
    /// Ledger backed by a JSON document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileStore::new(path))
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current state. Never fails.
    pub fn read(&self) -> LedgerState {
        let _guard = self.guard();
        self.store.load()
    }

    /// Preview the next sequence id and the completion count.
    ///
    /// Nothing is written; the id only becomes durable when an event using
    /// it is recorded.
    pub fn reserve(&self) -> Reservation {
        let _guard = self.guard();
        let state = self.store.load();
        Reservation {
            sequence_id: state.next_sequence_id,
            completed_count: state.completed_count,
        }
    }

    /// Persist the outcome of a purge attempt and return the updated state.
    pub fn record_event(&self, event: JobEvent) -> Result<LedgerState> {
        let _guard = self.guard();
        let mut state = self.store.load();

        debug!(
            sequence_id = event.sequence_id,
            subject = %event.subject_key,
            success = event.success,
            "Recording purge event"
        );
        state.apply_event(event);

        self.store.save(&state)?;
        Ok(state)
    }

    /// Discard the persisted ledger; the next read recreates defaults.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.guard();
        self.store.clear()?;
        info!("Ledger reset");
        Ok(())
    }

    /// Alias of [`Ledger::read`] for display purposes.
    pub fn statistics(&self) -> LedgerState {
        self.read()
    }

    /// Last successful purge of a client, if any.
    pub fn last_success(&self, subject_key: &str) -> Option<SubjectRecord> {
        let _guard = self.guard();
        self.store.load().subjects.get(subject_key).cloned()
    }

    /// The most recent `limit` events, oldest first.
    pub fn recent_history(&self, limit: usize) -> Vec<JobEvent> {
        let _guard = self.guard();
        self.store.load().recent_history(limit).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::types::ledger::INITIAL_FLOOR;
    use std::sync::Arc;
    use std::thread;

    fn event(sequence_id: u64, subject: &str, success: bool, bytes: u64) -> JobEvent {
        JobEvent {
            sequence_id,
            subject_key: subject.into(),
            display_name: "KHAIR Adam".into(),
            success,
            bytes_written: bytes,
            timestamp: "2025-06-01T09:30:00+00:00".into(),
            operator: "Operator Zero".into(),
        }
    }

    #[test]
    fn test_reserve_then_record_scenario() {
        let ledger = Ledger::new(MemoryStore::new());

        let reservation = ledger.reserve();
        assert_eq!(
            reservation,
            Reservation {
                sequence_id: 100001,
                completed_count: 0
            }
        );
        // Preview only: nothing persisted.
        assert!(!ledger.store().is_persisted());

        let state = ledger
            .record_event(event(reservation.sequence_id, "56851", true, 1000))
            .unwrap();
        assert_eq!(state.next_sequence_id, 100002);
        assert_eq!(state.completed_count, 1);
        assert_eq!(state.subjects["56851"].bytes_written, 1000);

        assert_eq!(ledger.last_success("56851").unwrap().sequence_id, 100001);
        assert!(ledger.last_success("00000").is_none());
    }

    #[test]
    fn test_reserve_is_repeatable_until_recorded() {
        let ledger = Ledger::new(MemoryStore::new());
        assert_eq!(ledger.reserve().sequence_id, INITIAL_FLOOR);
        assert_eq!(ledger.reserve().sequence_id, INITIAL_FLOOR);
    }

    #[test]
    fn test_recent_history() {
        let ledger = Ledger::new(MemoryStore::new());
        for i in 0..5 {
            ledger
                .record_event(event(INITIAL_FLOOR + i, &i.to_string(), i % 2 == 0, 1))
                .unwrap();
        }
        let recent = ledger.recent_history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].sequence_id, INITIAL_FLOOR + 3);
        assert_eq!(recent[1].sequence_id, INITIAL_FLOOR + 4);
        assert_eq!(ledger.recent_history(50).len(), 5);
    }

    #[test]
    fn test_reset_recreates_defaults() {
        let ledger = Ledger::new(MemoryStore::new());
        ledger.record_event(event(INITIAL_FLOOR, "1", true, 1)).unwrap();
        ledger.reset().unwrap();
        assert_eq!(ledger.read(), LedgerState::default());
    }

    #[test]
    fn test_concurrent_records_serialize() {
        let ledger = Arc::new(Ledger::new(MemoryStore::new()));
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for j in 0..25u64 {
                        let seq = INITIAL_FLOOR + i * 25 + j;
                        ledger
                            .record_event(event(seq, &format!("{i}-{j}"), true, 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = ledger.read();
        assert_eq!(state.completed_count, 200);
        assert_eq!(state.subjects.len(), 200);
        assert_eq!(state.next_sequence_id, INITIAL_FLOOR + 200);
    }

    #[test]
    fn test_file_backed_ledger_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("purger_state.json");

        let ledger = Ledger::open(&path);
        ledger.record_event(event(INITIAL_FLOOR, "56851", true, 1000)).unwrap();
        drop(ledger);

        let reopened = Ledger::open(&path);
        assert_eq!(reopened.reserve().sequence_id, INITIAL_FLOOR + 1);
        assert_eq!(reopened.reserve().completed_count, 1);

        std::fs::write(&path, b"\x00\x01garbage").unwrap();
        assert_eq!(reopened.read(), LedgerState::default());
    }
}
