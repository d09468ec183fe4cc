//! Testing utilities including mock collaborators.
//!
//! These let applications exercise the job and batch runners without a real
//! record source or an operator at the keyboard.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{PurgeError, Result};
use crate::security::credentials::Credentials;
use crate::traits::{
    extractor::{Extractor, SessionProvider},
    prompt::DuplicatePrompt,
};
use crate::types::{
    config::{PurgerConfig, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_OPERATOR},
    context::JobContext,
    ledger::SubjectRecord,
    record::{ExtractionUnit, Record},
};

/// Configuration rooted at `root` with credentials filled in.
pub fn test_config(root: &Path) -> PurgerConfig {
    PurgerConfig {
        archive_root: root.to_path_buf(),
        state_dir: root.join("_state"),
        staging_root: root.join("_staging"),
        default_manifest: None,
        operator: DEFAULT_OPERATOR.to_string(),
        credentials: Credentials::new("operator@example.com", "test-password"),
        download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
    }
}

/// A details-page row naming the client the way the record source does.
pub fn details_row(name: &str) -> Record {
    let mut row = Record::new();
    row.insert(format!("Client Details - {name}"), String::new());
    row.insert("Client Name".to_string(), name.to_string());
    row
}

/// Session handed out by [`MockSessions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSession {
    pub subject_key: String,
}

/// Mock session provider with acquire/release counting.
#[derive(Debug, Clone, Default)]
pub struct MockSessions {
    fail_all: Option<String>,
    fail_subjects: Arc<RwLock<HashSet<String>>>,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MockSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every acquisition fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_all: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Acquisition fails only for this client.
    pub fn fail_for(self, subject_key: impl Into<String>) -> Self {
        self.fail_subjects
            .write()
            .unwrap()
            .insert(subject_key.into());
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessions {
    type Session = MockSession;

    async fn acquire(&self, credentials: &Credentials, ctx: &JobContext) -> Result<MockSession> {
        credentials.ensure()?;
        if let Some(reason) = &self.fail_all {
            return Err(PurgeError::Session(reason.clone()));
        }
        if self.fail_subjects.read().unwrap().contains(&ctx.subject_key) {
            return Err(PurgeError::Session(format!(
                "sign-in failed for client {}",
                ctx.subject_key
            )));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            subject_key: ctx.subject_key.clone(),
        })
    }

    async fn release(&self, _session: MockSession) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockExtractCall {
    pub subject_key: String,
    pub unit: String,
}

/// Mock extractor with canned rows per unit.
///
/// Units without canned rows succeed with no rows.
#[derive(Debug, Clone, Default)]
pub struct MockExtractor {
    rows: Arc<RwLock<HashMap<String, Vec<Record>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    documents: Arc<RwLock<Vec<(String, Vec<u8>)>>>,
    calls: Arc<RwLock<Vec<MockExtractCall>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `rows` for `unit`.
    pub fn with_rows(self, unit: impl Into<String>, rows: Vec<Record>) -> Self {
        self.rows.write().unwrap().insert(unit.into(), rows);
        self
    }

    /// Make `unit` fail.
    pub fn failing(self, unit: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(unit.into());
        self
    }

    /// Drop a file into the documents folder when the `Documents` unit runs.
    pub fn with_document(self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.documents
            .write()
            .unwrap()
            .push((name.into(), content.into()));
        self
    }

    pub fn calls(&self) -> Vec<MockExtractCall> {
        self.calls.read().unwrap().clone()
    }

    /// Clients extracted so far, in order, without repeats.
    pub fn subjects(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for call in self.calls.read().unwrap().iter() {
            if !seen.contains(&call.subject_key) {
                seen.push(call.subject_key.clone());
            }
        }
        seen
    }
}

#[async_trait]
impl<S: Send> Extractor<S> for MockExtractor {
    async fn extract(
        &self,
        _session: &mut S,
        unit: &ExtractionUnit,
        ctx: &JobContext,
    ) -> Result<Vec<Record>> {
        self.calls.write().unwrap().push(MockExtractCall {
            subject_key: ctx.subject_key.clone(),
            unit: unit.name.clone(),
        });

        if self.failing.read().unwrap().contains(&unit.name) {
            return Err(PurgeError::unit(&unit.name, "mock failure"));
        }

        if unit.name == "Documents" {
            let documents = self.documents.read().unwrap().clone();
            let folder = ctx.documents_directory();
            for (name, content) in documents {
                fs::write(folder.join(name), content)?;
            }
        }

        Ok(self
            .rows
            .read()
            .unwrap()
            .get(&unit.name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Duplicate prompt with a fixed answer that remembers who it was asked about.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answer: bool,
    asked: RwLock<Vec<String>>,
    notices: RwLock<Vec<PathBuf>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.read().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<PathBuf> {
        self.notices.read().unwrap().clone()
    }
}

impl DuplicatePrompt for ScriptedPrompt {
    fn confirm(&self, subject_key: &str, _record: &SubjectRecord, notice_path: &Path) -> bool {
        self.asked.write().unwrap().push(subject_key.to_string());
        self.notices.write().unwrap().push(notice_path.to_path_buf());
        self.answer
    }
}
