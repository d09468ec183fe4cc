//! Job and batch results.

use std::path::PathBuf;

use crate::error::PurgeError;
use crate::types::ledger::SubjectRecord;

/// How a single job ended.
///
/// Duplicates are an expected outcome rather than an error, so callers can
/// branch on them without unwinding.
#[derive(Debug)]
pub enum JobOutcome {
    /// Output finalized and success recorded
    Completed { sequence_id: u64, location: PathBuf },

    /// Client already purged and the duplicate policy refused a rerun
    Duplicate {
        subject_key: String,
        record: SubjectRecord,
        notice_path: PathBuf,
    },

    /// Job aborted; nothing was recorded
    Failed(PurgeError),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Collapse into a `Result`, turning a duplicate back into `DuplicateJob`.
    pub fn into_result(self) -> Result<PathBuf, PurgeError> {
        match self {
            Self::Completed { location, .. } => Ok(location),
            Self::Duplicate {
                subject_key,
                record,
                notice_path,
            } => Err(PurgeError::DuplicateJob {
                subject_key,
                record,
                notice_path,
            }),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Status of one manifest entry after a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Duplicate,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-client batch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub subject_key: String,
    pub status: BatchStatus,

    /// Final archive folder; `None` for skipped duplicates
    pub location: Option<PathBuf>,
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub duplicates: usize,
}

impl BatchSummary {
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, entry| {
            match entry.status {
                BatchStatus::Completed => acc.completed += 1,
                BatchStatus::Duplicate => acc.duplicates += 1,
            }
            acc
        })
    }
}
