//! Sequential batch runs over a manifest queue.

use crate::error::Result;
use crate::pipeline::job::{JobRequest, JobRunner};
use crate::pipeline::manifest::ManifestEntry;
use crate::traits::{
    extractor::{Extractor, SessionProvider},
    store::LedgerStore,
};
use crate::types::{
    config::DuplicatePolicy,
    outcome::{BatchEntry, BatchStatus, BatchSummary, JobOutcome},
};

/// Run every queued client in order under one duplicate policy.
///
/// Duplicates are skipped and reported; any other failure stops the batch
/// and is returned, leaving later clients untouched. Operators are never
/// prompted during a batch.
pub async fn run_batch<S, P, X>(
    runner: &JobRunner<S, P, X>,
    queue: &[ManifestEntry],
    allow_duplicate: bool,
) -> Result<Vec<BatchEntry>>
where
    S: LedgerStore,
    P: SessionProvider,
    X: Extractor<P::Session>,
{
    let notifier = runner.notifier();
    let policy = DuplicatePolicy {
        allow_duplicate,
        prompt: false,
    };

    notifier.info(format!("Batch purge armed for {} client(s).", queue.len()));
    let mut entries = Vec::with_capacity(queue.len());
    for item in queue {
        notifier.info(format!(
            "Starting purge for manifest client {} [{}].",
            item.subject_key,
            item.package_label()
        ));

        let mut request = JobRequest::new(&item.subject_key).with_policy(policy);
        if let Some(name) = &item.display_name {
            request = request.with_display_name(name);
        }

        match runner.run(&request).await {
            JobOutcome::Completed { location, .. } => entries.push(BatchEntry {
                subject_key: item.subject_key.clone(),
                status: BatchStatus::Completed,
                location: Some(location),
            }),
            JobOutcome::Duplicate {
                subject_key,
                record,
                ..
            } => {
                notifier.info(format!(
                    "Skipping client {}: already purged at {}",
                    subject_key,
                    record.timestamp_or_unknown()
                ));
                entries.push(BatchEntry {
                    subject_key,
                    status: BatchStatus::Duplicate,
                    location: None,
                });
            }
            JobOutcome::Failed(e) => {
                notifier.warn(format!(
                    "Batch purge halted on client {}: {}",
                    item.subject_key, e
                ));
                return Err(e);
            }
        }
    }

    let summary = BatchSummary::from_entries(&entries);
    notifier.info(format!(
        "Batch purge finished: {} completed, {} skipped as duplicates.",
        summary.completed, summary.duplicates
    ));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PurgeError;
    use crate::ledger::Ledger;
    use crate::stores::MemoryStore;
    use crate::testing::{test_config, MockExtractor, MockSessions};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn queue(ids: &[&str]) -> Vec<ManifestEntry> {
        ids.iter().map(|id| ManifestEntry::new(*id)).collect()
    }

    #[tokio::test]
    async fn test_duplicates_are_skipped() {
        let temp = tempdir().unwrap();
        let runner = JobRunner::new(
            Arc::new(Ledger::new(MemoryStore::new())),
            MockSessions::new(),
            MockExtractor::new(),
            &test_config(temp.path()),
        );
        runner.run(&JobRequest::new("B")).await.into_result().unwrap();
        let before = runner.ledger().statistics().completed_count;

        let entries = run_batch(&runner, &queue(&["A", "B", "C"]), false)
            .await
            .unwrap();

        let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                BatchStatus::Completed,
                BatchStatus::Duplicate,
                BatchStatus::Completed
            ]
        );
        assert!(entries[1].location.is_none());
        assert_eq!(runner.ledger().statistics().completed_count, before + 2);
    }

    #[tokio::test]
    async fn test_override_reruns_duplicates() {
        let temp = tempdir().unwrap();
        let runner = JobRunner::new(
            Arc::new(Ledger::new(MemoryStore::new())),
            MockSessions::new(),
            MockExtractor::new(),
            &test_config(temp.path()),
        );
        runner.run(&JobRequest::new("B")).await.into_result().unwrap();

        let entries = run_batch(&runner, &queue(&["A", "B"]), true).await.unwrap();
        assert!(entries.iter().all(|e| e.status == BatchStatus::Completed));
        assert_eq!(runner.ledger().read().next_sequence_id, 100_004);
    }

    #[tokio::test]
    async fn test_failure_halts_batch() {
        let temp = tempdir().unwrap();
        let extractor = MockExtractor::new();
        let runner = JobRunner::new(
            Arc::new(Ledger::new(MemoryStore::new())),
            MockSessions::new().fail_for("B"),
            extractor.clone(),
            &test_config(temp.path()),
        );

        let err = run_batch(&runner, &queue(&["A", "B", "C"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::Session(_)));
        assert_eq!(extractor.subjects(), vec!["A".to_string()]);

        let state = runner.ledger().read();
        assert_eq!(state.completed_count, 1);
        assert!(!state.subjects.contains_key("C"));
    }

    #[tokio::test]
    async fn test_manifest_names_are_used() {
        let temp = tempdir().unwrap();
        let runner = JobRunner::new(
            Arc::new(Ledger::new(MemoryStore::new())),
            MockSessions::new(),
            MockExtractor::new(),
            &test_config(temp.path()),
        );

        let queue = vec![ManifestEntry::new("42")
            .with_display_name("Sam Smith")
            .with_package("Core")];
        let entries = run_batch(&runner, &queue, false).await.unwrap();
        assert_eq!(
            entries[0].location.as_deref(),
            Some(temp.path().join("100001 Sam Smith (42)").as_path())
        );
    }
}
