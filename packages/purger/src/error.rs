//! Typed errors for the purger library.
//!
//! Uses `thiserror` for library errors (not `anyhow`); the CLI adds context
//! at the application edge.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::ledger::SubjectRecord;

/// Errors that can occur while coordinating purge jobs.
#[derive(Debug, Error)]
pub enum PurgeError {
    /// Persisted ledger could not be decoded.
    ///
    /// Never returned by ledger reads (defaults are substituted); kept so the
    /// recovery can be logged with a typed cause.
    #[error("corrupt ledger at {path}: {reason}")]
    CorruptLedger { path: PathBuf, reason: String },

    /// Subject already has a completed purge on record
    #[error("client {subject_key} was last purged at {}", .record.timestamp_or_unknown())]
    DuplicateJob {
        subject_key: String,
        record: SubjectRecord,
        notice_path: PathBuf,
    },

    /// Required secret is absent
    #[error("missing credential: {name}")]
    MissingCredential { name: &'static str },

    /// A single page/unit failed during extraction
    #[error("extraction of {unit} failed: {reason}")]
    ExtractionUnit { unit: String, reason: String },

    /// Bounded download wait exceeded
    #[error("timed out after {waited:?} waiting for download in {folder}")]
    DownloadTimeout { folder: PathBuf, waited: Duration },

    /// Moving the working directory into place failed
    #[error("failed to finalize {from} -> {to}: {source}")]
    Finalize {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger could not be persisted
    #[error("ledger write failed: {0}")]
    Ledger(#[source] std::io::Error),

    /// Session resource could not be acquired
    #[error("session error: {0}")]
    Session(String),

    /// An extractor panicked mid-job; the session was still released
    #[error("extraction panicked: {0}")]
    ExtractionPanicked(String),

    /// Configuration value present but unusable
    #[error("config error: {0}")]
    Config(String),

    /// Manifest missing or unusable
    #[error("manifest error: {0}")]
    Manifest(String),

    /// One or more steps of a reset failed
    #[error("reset incomplete: {0}")]
    Reset(String),

    /// CSV encoding/decoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PurgeError {
    /// Build an extraction unit failure from any displayable cause.
    pub fn unit(unit: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ExtractionUnit {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is the recoverable duplicate-subject case.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateJob { .. })
    }
}

/// Result type alias for purger operations.
pub type Result<T> = std::result::Result<T, PurgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message_includes_timestamp() {
        let record = SubjectRecord {
            sequence_id: 100001,
            display_name: "KHAIR Adam".into(),
            bytes_written: 10,
            timestamp: "2025-01-02T03:04:05+00:00".into(),
            operator: "ops".into(),
        };
        let err = PurgeError::DuplicateJob {
            subject_key: "56851".into(),
            record,
            notice_path: PathBuf::from("/tmp/56851_duplicate_notice.csv"),
        };
        assert!(err.is_duplicate());
        assert_eq!(
            err.to_string(),
            "client 56851 was last purged at 2025-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn test_unit_helper() {
        let err = PurgeError::unit("Notes", "table missing");
        assert!(!err.is_duplicate());
        assert_eq!(err.to_string(), "extraction of Notes failed: table missing");
    }
}
