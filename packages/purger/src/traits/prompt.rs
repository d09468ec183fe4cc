//! Operator confirmation for duplicate purges.

use std::path::Path;

use crate::types::ledger::SubjectRecord;

/// Asks the operator whether an already purged client should run again.
pub trait DuplicatePrompt: Send + Sync {
    /// Return true only on an explicit affirmative answer.
    fn confirm(&self, subject_key: &str, record: &SubjectRecord, notice_path: &Path) -> bool;
}
