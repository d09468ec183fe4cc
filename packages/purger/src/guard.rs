//! Duplicate guard: consulted before a sequence id is previewed.
//!
//! A prior success always leaves a notice file behind, whatever the policy
//! decides, so operators can inspect why a client was skipped or rerun.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};

use crate::error::Result;
use crate::ledger::Ledger;
use crate::log::Notifier;
use crate::traits::{prompt::DuplicatePrompt, store::LedgerStore};
use crate::types::{config::DuplicatePolicy, context::safe_filename, ledger::SubjectRecord};

/// What the guard decided for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Run the job; `prior` is set when this is an accepted rerun
    Proceed { prior: Option<SubjectRecord> },

    /// Do not run the job
    Reject {
        record: SubjectRecord,
        notice_path: PathBuf,
    },
}

/// Checks the ledger for prior purges and applies the duplicate policy.
#[derive(Clone)]
pub struct DuplicateGuard {
    reports_dir: PathBuf,
    prompt: Option<Arc<dyn DuplicatePrompt>>,
    notifier: Notifier,
}

impl DuplicateGuard {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            prompt: None,
            notifier: Notifier::new(),
        }
    }

    /// Set the operator prompt used by interactive policies.
    pub fn with_prompt(mut self, prompt: Arc<dyn DuplicatePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Last successful purge of `subject_key`, if any.
    pub fn check<S: LedgerStore>(&self, ledger: &Ledger<S>, subject_key: &str) -> Option<SubjectRecord> {
        ledger.last_success(subject_key)
    }

    /// Decide whether a job for `subject_key` may run.
    pub fn evaluate<S: LedgerStore>(
        &self,
        ledger: &Ledger<S>,
        subject_key: &str,
        policy: DuplicatePolicy,
    ) -> Result<GuardDecision> {
        let Some(record) = self.check(ledger, subject_key) else {
            return Ok(GuardDecision::Proceed { prior: None });
        };

        let notice_path = write_duplicate_notice(&self.reports_dir, subject_key, &record)?;
        self.notifier.info(format!(
            "Client {} already has a purge record ({}). Details mirrored at {}.",
            subject_key,
            format_timestamp(&record.timestamp),
            notice_path.display()
        ));

        if policy.allow_duplicate {
            self.notifier
                .info("Duplicate override enabled. Continuing with purge.");
            return Ok(GuardDecision::Proceed {
                prior: Some(record),
            });
        }

        if policy.prompt {
            let confirmed = self
                .prompt
                .as_ref()
                .is_some_and(|prompt| prompt.confirm(subject_key, &record, &notice_path));
            if confirmed {
                self.notifier
                    .info("Operator confirmed duplicate purge. Continuing.");
                return Ok(GuardDecision::Proceed {
                    prior: Some(record),
                });
            }
        }

        Ok(GuardDecision::Reject {
            record,
            notice_path,
        })
    }
}

impl std::fmt::Debug for DuplicateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateGuard")
            .field("reports_dir", &self.reports_dir)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

/// Write `<subject>_duplicate_notice.csv` describing the prior purge.
pub fn write_duplicate_notice(
    reports_dir: &Path,
    subject_key: &str,
    record: &SubjectRecord,
) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)?;
    let path = reports_dir.join(format!("{}_duplicate_notice.csv", safe_filename(subject_key)));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["TurnPointID", "Time of Purge"])?;
    writer.write_record([subject_key, record.timestamp.as_str()])?;
    writer.flush()?;

    Ok(path)
}

/// Render a stored timestamp as `YYYY-MM-DD HH:MM` for humans.
///
/// Unparseable values are returned verbatim; empty ones as `unknown`.
pub fn format_timestamp(timestamp: &str) -> String {
    if timestamp.is_empty() {
        return "unknown".to_string();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }
    timestamp.to_string()
}
