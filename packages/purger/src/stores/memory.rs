//! In-memory ledger backend for testing and embedding.

use std::sync::{PoisonError, RwLock};

use crate::error::Result;
use crate::traits::store::LedgerStore;
use crate::types::ledger::LedgerState;

/// In-memory ledger.
///
/// Data is lost when the store is dropped. `None` models "nothing persisted
/// yet", so loads return defaults exactly like a fresh file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Option<LedgerState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state.
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }

    /// Whether anything has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> LedgerState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
