//! Client Purge Ledger and Job Orchestration
//!
//! Coordinates repeated, long-running purge jobs against an external record
//! source. Each client is purged at most once under normal operation, every
//! job gets a sequence id that keeps increasing across process restarts, and
//! half-written output never lands where a finished archive is expected.
//!
//! # Design Philosophy
//!
//! - The ledger is the single source of truth; only completed jobs touch it
//! - Page extraction and sessions are injected collaborators, never built in
//! - A failed page is logged and skipped; a failed job is surfaced
//! - Duplicates are an outcome, not a crash
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use purger::{JobOutcome, JobRequest, JobRunner, Ledger, PurgerConfig, StagedExportSource};
//!
//! let config = PurgerConfig::from_env()?;
//! let ledger = Arc::new(Ledger::open(config.ledger_path()));
//! let source = StagedExportSource::from_config(&config);
//! let runner = JobRunner::new(ledger, source.clone(), source, &config);
//!
//! match runner.run(&JobRequest::new("56851")).await {
//!     JobOutcome::Completed { location, .. } => println!("saved to {}", location.display()),
//!     JobOutcome::Duplicate { notice_path, .. } => println!("see {}", notice_path.display()),
//!     JobOutcome::Failed(e) => return Err(e.into()),
//! }
//! ```
//!
//! # Modules
//!
//! - [`ledger`] - Sequence allocation, event recording and queries
//! - [`guard`] - Duplicate detection and notices
//! - [`archive`] - Atomic finalization of job output
//! - [`pipeline`] - Job and batch orchestration, manifests
//! - [`stores`] - Ledger storage (JSON file, in-memory)
//! - [`sources`] - Record-source implementations
//! - [`traits`] - Collaborator seams (store, session, extractor, prompt)
//! - [`testing`] - Mock collaborators for tests

pub mod archive;
pub mod downloads;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod log;
pub mod output;
pub mod pipeline;
pub mod reset;
pub mod security;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{PurgeError, Result};
pub use guard::{DuplicateGuard, GuardDecision};
pub use ledger::{Ledger, Reservation};
pub use log::{LogSink, Notifier};
pub use reset::reset_purge_data;
pub use security::credentials::{Credentials, SecretString};
pub use traits::{
    extractor::{Extractor, SessionProvider},
    prompt::DuplicatePrompt,
    store::LedgerStore,
};
pub use types::{
    config::{DuplicatePolicy, PurgerConfig},
    context::JobContext,
    ledger::{JobEvent, LedgerState, SubjectRecord, HISTORY_LIMIT, INITIAL_FLOOR},
    outcome::{BatchEntry, BatchStatus, BatchSummary, JobOutcome},
    record::{default_units, ExtractionUnit, Record},
};

// Re-export pipeline components
pub use pipeline::{
    build_batch_queue, load_manifest, parse_package_args, run_batch, JobRequest, JobRunner,
    ManifestEntry,
};

// Re-export stores and sources
pub use sources::{StagedExportSource, StagedSession};
pub use stores::{JsonFileStore, MemoryStore};

// Re-export testing utilities
pub use testing::{MockExtractor, MockSessions, ScriptedPrompt};
