//! Storage trait for the ledger document.

use crate::error::Result;
use crate::types::ledger::LedgerState;

/// Load/save backend for the ledger.
///
/// Implementations do no locking of their own; [`crate::Ledger`] serializes
/// every read-modify-write around them.
pub trait LedgerStore: Send + Sync {
    /// Load the persisted state.
    ///
    /// Never fails: missing or unreadable storage yields
    /// `LedgerState::default()`.
    fn load(&self) -> LedgerState;

    /// Replace the persisted state.
    ///
    /// Must be atomic: a concurrent `load` sees either the old or the new
    /// document, never a mix.
    fn save(&self, state: &LedgerState) -> Result<()>;

    /// Discard the persisted state entirely.
    fn clear(&self) -> Result<()>;
}
