//! Single-job lifecycle.
//!
//! `Idle → DuplicateChecked → SequenceAssigned → ContextReady → Extracting →
//! Finalizing → Recorded`. Only a completed job touches the ledger; anything
//! that fails before `Recorded` is returned to the caller and nothing is
//! written.

use std::any::Any;
use std::fs;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;

use crate::archive;
use crate::error::{PurgeError, Result};
use crate::guard::{DuplicateGuard, GuardDecision};
use crate::ledger::Ledger;
use crate::log::{LogSink, Notifier};
use crate::output::write_unit_csv;
use crate::security::credentials::Credentials;
use crate::traits::{
    extractor::{Extractor, SessionProvider},
    prompt::DuplicatePrompt,
    store::LedgerStore,
};
use crate::types::{
    config::{DuplicatePolicy, PurgerConfig},
    context::{derive_display_name, JobContext},
    ledger::JobEvent,
    outcome::JobOutcome,
};

/// One client to purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub subject_key: String,

    /// Friendly name to start with; refined from the details page
    pub display_name: Option<String>,

    pub policy: DuplicatePolicy,
}

impl JobRequest {
    pub fn new(subject_key: impl Into<String>) -> Self {
        Self {
            subject_key: subject_key.into().trim().to_string(),
            display_name: None,
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.display_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Per-unit tally for one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub extracted: Vec<String>,
    pub failed: Vec<String>,
}

/// Drives purge jobs against a ledger and the injected collaborators.
pub struct JobRunner<S, P, X> {
    ledger: Arc<Ledger<S>>,
    sessions: P,
    extractor: X,
    guard: DuplicateGuard,
    archive_root: PathBuf,
    credentials: Credentials,
    operator: String,
    notifier: Notifier,
}

impl<S, P, X> JobRunner<S, P, X>
where
    S: LedgerStore,
    P: SessionProvider,
    X: Extractor<P::Session>,
{
    pub fn new(ledger: Arc<Ledger<S>>, sessions: P, extractor: X, config: &PurgerConfig) -> Self {
        Self {
            ledger,
            sessions,
            extractor,
            guard: DuplicateGuard::new(config.duplicate_reports_dir()),
            archive_root: config.archive_root.clone(),
            credentials: config.credentials.clone(),
            operator: config.operator.clone(),
            notifier: Notifier::new(),
        }
    }

    /// Operator prompt for interactive duplicate policies.
    pub fn with_prompt(mut self, prompt: Arc<dyn DuplicatePrompt>) -> Self {
        self.guard = self.guard.with_prompt(prompt);
        self
    }

    /// Forward progress messages to a front end.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.notifier = Notifier::with_sink(sink);
        self.guard = self.guard.with_notifier(self.notifier.clone());
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        let operator = operator.into();
        if !operator.trim().is_empty() {
            self.operator = operator.trim().to_string();
        }
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub(crate) fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Run one job to completion.
    ///
    /// Fatal errors are logged through the sink and returned as
    /// `JobOutcome::Failed`.
    pub async fn run(&self, request: &JobRequest) -> JobOutcome {
        match self.execute(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notifier.warn(format!(
                    "Purge of client {} failed: {}",
                    request.subject_key, e
                ));
                JobOutcome::Failed(e)
            }
        }
    }

    async fn execute(&self, request: &JobRequest) -> Result<JobOutcome> {
        // Idle -> DuplicateChecked
        let decision = self
            .guard
            .evaluate(&self.ledger, &request.subject_key, request.policy)?;
        if let GuardDecision::Reject {
            record,
            notice_path,
        } = decision
        {
            return Ok(JobOutcome::Duplicate {
                subject_key: request.subject_key.clone(),
                record,
                notice_path,
            });
        }

        // DuplicateChecked -> SequenceAssigned
        let reservation = self.ledger.reserve();
        self.notifier.info(format!(
            "Universal sequence {} armed. {} client(s) purged so far.",
            reservation.sequence_id, reservation.completed_count
        ));
        let mut ctx = JobContext::new(
            &self.archive_root,
            reservation.sequence_id,
            &request.subject_key,
            request.display_name.as_deref(),
        );

        // Nothing touches disk until sign-in details are known to exist
        self.credentials.ensure()?;

        // SequenceAssigned -> ContextReady
        self.prepare(&ctx)?;

        // ContextReady -> Extracting
        self.notifier.info(format!(
            "Launching session for client {}",
            request.subject_key
        ));
        let mut session = self.sessions.acquire(&self.credentials, &ctx).await?;
        let extraction = AssertUnwindSafe(self.extract_all(&mut session, &mut ctx))
            .catch_unwind()
            .await;
        self.sessions.release(session).await;
        let report = extraction.map_err(|panic_info| {
            PurgeError::ExtractionPanicked(panic_message(panic_info.as_ref()))
        })?;
        self.notifier.info(format!(
            "Extraction finished: {} unit(s) extracted, {} failed",
            report.extracted.len(),
            report.failed.len()
        ));

        // Extracting -> Finalizing
        let location = archive::finalize(&ctx.working_directory, &ctx.final_directory)?;

        // Finalizing -> Recorded
        let bytes_written = archive::directory_bytes(&location);
        let state = self.ledger.record_event(JobEvent {
            sequence_id: ctx.sequence_id,
            subject_key: ctx.subject_key.clone(),
            display_name: ctx.display_name.clone(),
            success: true,
            bytes_written,
            timestamp: Utc::now().to_rfc3339(),
            operator: self.operator.clone(),
        })?;

        self.notifier.info(format!(
            "Purging complete. Files saved to {}",
            location.display()
        ));
        self.notifier.info(format!(
            "Purge counters updated -> total {} | next universal slot {}",
            state.completed_count, state.next_sequence_id
        ));

        Ok(JobOutcome::Completed {
            sequence_id: ctx.sequence_id,
            location,
        })
    }

    fn prepare(&self, ctx: &JobContext) -> Result<()> {
        fs::create_dir_all(&ctx.working_directory)?;
        fs::create_dir_all(ctx.documents_directory())?;

        let removed = archive::purge_foreign_outputs(&ctx.working_directory, &ctx.file_prefix())?;
        if removed > 0 {
            self.notifier.info(format!(
                "Removed {} leftover file(s) from an earlier run",
                removed
            ));
        }
        Ok(())
    }

    async fn extract_all(&self, session: &mut P::Session, ctx: &mut JobContext) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        for unit in self.extractor.units() {
            let rows = match self.extractor.extract(session, &unit, ctx).await {
                Ok(rows) => rows,
                Err(e) => {
                    self.notifier
                        .warn(format!("Error extracting {}: {}", unit.name, e));
                    report.failed.push(unit.name.clone());
                    continue;
                }
            };

            if unit.names_subject {
                if let Some(name) = rows.first().and_then(derive_display_name) {
                    if ctx.refine_display_name(&name) {
                        self.notifier
                            .info(format!("Client name resolved to {}", ctx.display_name));
                    }
                }
            }

            match write_unit_csv(ctx, &unit, &rows) {
                Ok(_) => {
                    self.notifier
                        .info(format!("Extracted {} rows for {}", rows.len(), unit.name));
                    report.extracted.push(unit.name.clone());
                }
                Err(e) => {
                    self.notifier
                        .warn(format!("Error extracting {}: {}", unit.name, e));
                    report.failed.push(unit.name.clone());
                }
            }
        }

        report
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<S, P, X> std::fmt::Debug for JobRunner<S, P, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("archive_root", &self.archive_root)
            .field("operator", &self.operator)
            .field("guard", &self.guard)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{
        details_row, test_config, MockExtractor, MockSession, MockSessions, ScriptedPrompt,
    };
    use crate::types::record::{ExtractionUnit, Record};
    use crate::types::ledger::INITIAL_FLOOR;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn runner(
        root: &Path,
        extractor: MockExtractor,
        sessions: MockSessions,
    ) -> JobRunner<MemoryStore, MockSessions, MockExtractor> {
        let config = test_config(root);
        JobRunner::new(
            Arc::new(Ledger::new(MemoryStore::new())),
            sessions,
            extractor,
            &config,
        )
    }

    #[tokio::test]
    async fn test_completed_job_records_success() {
        let temp = tempdir().unwrap();
        let extractor = MockExtractor::new()
            .with_rows("Client-Details", vec![details_row("KHAIR Adam")])
            .with_rows("Notes", vec![details_row("ignored"), details_row("ignored")]);
        let sessions = MockSessions::new();
        let runner = runner(temp.path(), extractor, sessions.clone());

        let outcome = runner.run(&JobRequest::new("56851")).await;
        let JobOutcome::Completed {
            sequence_id,
            location,
        } = outcome
        else {
            panic!("expected completion, got {outcome:?}");
        };

        assert_eq!(sequence_id, INITIAL_FLOOR);
        assert_eq!(location, temp.path().join("100001 KHAIR Adam (56851)"));
        assert!(location.join("100001 Client-Details.csv").exists());
        assert!(location.join("100001 Notes.csv").exists());
        assert!(location.join("100001 Documents").is_dir());
        assert!(!temp.path().join("100001 56851").exists());

        let state = runner.ledger().read();
        assert_eq!(state.next_sequence_id, INITIAL_FLOOR + 1);
        assert_eq!(state.completed_count, 1);
        let record = &state.subjects["56851"];
        assert_eq!(record.display_name, "KHAIR Adam");
        assert_eq!(record.operator, "Operator Zero");
        assert_eq!(record.bytes_written, archive::directory_bytes(&location));
        assert!(record.bytes_written > 0);

        assert_eq!(sessions.acquired(), 1);
        assert_eq!(sessions.released(), 1);
    }

    #[tokio::test]
    async fn test_unit_failures_are_skipped() {
        let temp = tempdir().unwrap();
        let extractor = MockExtractor::new()
            .failing("Client-Details")
            .failing("Notes")
            .with_rows("Contacts", vec![details_row("x")]);
        let runner = runner(temp.path(), extractor.clone(), MockSessions::new());

        let location = runner
            .run(&JobRequest::new("777").with_display_name("Jane Doe"))
            .await
            .into_result()
            .unwrap();

        assert_eq!(location, temp.path().join("100001 Jane Doe (777)"));
        assert!(!location.join("100001 Notes.csv").exists());
        assert!(location.join("100001 Contacts.csv").exists());
        assert_eq!(extractor.calls().len(), 10);
        assert_eq!(runner.ledger().read().completed_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected_before_reservation() {
        let temp = tempdir().unwrap();
        let sessions = MockSessions::new();
        let runner = runner(temp.path(), MockExtractor::new(), sessions.clone());

        runner.run(&JobRequest::new("56851")).await.into_result().unwrap();
        let before = runner.ledger().read();

        let outcome = runner.run(&JobRequest::new("56851")).await;
        let JobOutcome::Duplicate {
            record,
            notice_path,
            ..
        } = outcome
        else {
            panic!("expected duplicate");
        };
        assert_eq!(record.sequence_id, INITIAL_FLOOR);
        assert!(notice_path.exists());
        assert_eq!(runner.ledger().read(), before);
        assert_eq!(runner.ledger().reserve().sequence_id, INITIAL_FLOOR + 1);
        assert_eq!(sessions.acquired(), 1);
    }

    #[tokio::test]
    async fn test_override_reruns_and_replaces_record() {
        let temp = tempdir().unwrap();
        let runner = runner(temp.path(), MockExtractor::new(), MockSessions::new());

        runner.run(&JobRequest::new("56851")).await.into_result().unwrap();
        let location = runner
            .run(&JobRequest::new("56851").with_policy(DuplicatePolicy::overriding()))
            .await
            .into_result()
            .unwrap();

        assert_eq!(location, temp.path().join("100002 56851 (56851)"));
        let state = runner.ledger().read();
        assert_eq!(state.completed_count, 1);
        assert_eq!(state.subjects["56851"].sequence_id, INITIAL_FLOOR + 1);
        assert_eq!(state.history.len(), 2);
    }

    #[tokio::test]
    async fn test_interactive_confirmation() {
        let temp = tempdir().unwrap();
        let prompt = Arc::new(ScriptedPrompt::answering(true));
        let runner = runner(temp.path(), MockExtractor::new(), MockSessions::new())
            .with_prompt(prompt.clone());

        runner.run(&JobRequest::new("1")).await.into_result().unwrap();
        let outcome = runner
            .run(&JobRequest::new("1").with_policy(DuplicatePolicy::interactive()))
            .await;
        assert!(outcome.is_completed());
        assert_eq!(prompt.asked(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_session() {
        let temp = tempdir().unwrap();
        let sessions = MockSessions::new();
        let runner = runner(temp.path(), MockExtractor::new(), sessions.clone())
            .with_credentials(Credentials::default());

        let outcome = runner.run(&JobRequest::new("56851")).await;
        assert!(matches!(
            outcome,
            JobOutcome::Failed(PurgeError::MissingCredential { .. })
        ));
        assert_eq!(sessions.acquired(), 0);
        assert_eq!(runner.ledger().read(), Default::default());
        assert!(!temp.path().join("100001 56851").exists());
    }

    struct PanickingExtractor;

    #[async_trait::async_trait]
    impl Extractor<MockSession> for PanickingExtractor {
        async fn extract(
            &self,
            _session: &mut MockSession,
            unit: &ExtractionUnit,
            _ctx: &JobContext,
        ) -> Result<Vec<Record>> {
            panic!("page layout changed under {}", unit.name);
        }
    }

    #[tokio::test]
    async fn test_panicking_extractor_still_releases_session() {
        let temp = tempdir().unwrap();
        let sessions = MockSessions::new();
        let runner = JobRunner::new(
            Arc::new(Ledger::new(MemoryStore::new())),
            sessions.clone(),
            PanickingExtractor,
            &test_config(temp.path()),
        );

        let outcome = runner.run(&JobRequest::new("56851")).await;
        let JobOutcome::Failed(PurgeError::ExtractionPanicked(message)) = outcome else {
            panic!("expected a panic to be reported, got {outcome:?}");
        };
        assert_eq!(message, "page layout changed under Client-Details");
        assert_eq!(sessions.acquired(), 1);
        assert_eq!(sessions.released(), 1);
        assert!(!runner.ledger().store().is_persisted());
    }

    #[tokio::test]
    async fn test_hostile_client_name_stays_inside_archive() {
        let temp = tempdir().unwrap();
        let extractor =
            MockExtractor::new().with_rows("Client-Details", vec![details_row("x/../../escaped")]);
        let runner = runner(temp.path(), extractor, MockSessions::new());

        let location = runner
            .run(&JobRequest::new("56851"))
            .await
            .into_result()
            .unwrap();
        assert_eq!(location, temp.path().join("100001 x_.._.._escaped (56851)"));
        assert_eq!(location.parent(), Some(temp.path()));
        assert!(!temp.path().join("100001 x").exists());
    }

    #[tokio::test]
    async fn test_session_failure_is_not_recorded() {
        let temp = tempdir().unwrap();
        let sessions = MockSessions::failing("login rejected");
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let captured = Arc::clone(&lines);
        let runner = runner(temp.path(), MockExtractor::new(), sessions.clone()).with_log_sink(
            Arc::new(move |line: &str| captured.lock().unwrap().push(line.to_string())),
        );

        let outcome = runner.run(&JobRequest::new("56851")).await;
        assert!(matches!(outcome, JobOutcome::Failed(PurgeError::Session(_))));
        assert_eq!(sessions.released(), 0);
        assert!(!runner.ledger().store().is_persisted());
        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|line| line.contains("Purge of client 56851 failed")));
    }

    #[tokio::test]
    async fn test_leftover_outputs_are_purged() {
        let temp = tempdir().unwrap();
        let working = temp.path().join("100001 56851");
        fs::create_dir_all(&working).unwrap();
        fs::write(working.join("99999 Notes.csv"), "stale").unwrap();

        let runner = runner(temp.path(), MockExtractor::new(), MockSessions::new());
        let location = runner
            .run(&JobRequest::new("56851"))
            .await
            .into_result()
            .unwrap();
        assert!(!location.join("99999 Notes.csv").exists());
    }

    #[test]
    fn test_request_builder() {
        let request = JobRequest::new(" 56851 ").with_display_name("  ");
        assert_eq!(request.subject_key, "56851");
        assert_eq!(request.display_name, None);
        assert_eq!(request.policy, DuplicatePolicy::strict());
    }
}
