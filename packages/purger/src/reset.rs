//! Fresh-start reset of archives and counters.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PurgeError, Result};
use crate::ledger::Ledger;
use crate::log::Notifier;
use crate::traits::store::LedgerStore;

/// Delete the archive root and discard the ledger.
///
/// Both steps are always attempted; failures are joined into one
/// `PurgeError::Reset`.
pub fn reset_purge_data<S: LedgerStore>(
    archive_root: &Path,
    ledger: &Ledger<S>,
    notifier: &Notifier,
) -> Result<()> {
    let mut errors = Vec::new();

    match fs::remove_dir_all(archive_root) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => errors.push(format!("archive removal failed: {e}")),
    }
    if let Err(e) = ledger.reset() {
        errors.push(format!("state reset failed: {e}"));
    }

    if !errors.is_empty() {
        let message = errors.join("; ");
        notifier.warn(format!("Reset incomplete: {message}"));
        return Err(PurgeError::Reset(message));
    }
    notifier.info("Purge archives and counters reset. Fresh start armed.");
    Ok(())
}
