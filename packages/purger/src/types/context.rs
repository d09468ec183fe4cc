//! Per-job working state.

use std::path::{Path, PathBuf};

use crate::types::record::Record;

/// Context for one purge job, owned by the job runner until the job ends.
///
/// The working directory is keyed by sequence and client id only; the final
/// directory carries the human-readable name and moves whenever the display
/// name is refined.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub sequence_id: u64,
    pub subject_key: String,
    pub display_name: String,
    pub working_directory: PathBuf,
    pub final_directory: PathBuf,
    archive_root: PathBuf,
}

impl JobContext {
    /// Derive directory layout for a reserved sequence.
    pub fn new(
        archive_root: impl Into<PathBuf>,
        sequence_id: u64,
        subject_key: impl Into<String>,
        display_name: Option<&str>,
    ) -> Self {
        let archive_root = archive_root.into();
        let subject_key = subject_key.into();
        let display_name = display_name
            .map(normalize_label)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| subject_key.clone());

        let working_directory =
            archive_root.join(format!("{sequence_id} {}", safe_filename(&subject_key)));
        let final_directory =
            final_directory_for(&archive_root, sequence_id, &subject_key, &display_name);

        Self {
            sequence_id,
            subject_key,
            display_name,
            working_directory,
            final_directory,
            archive_root,
        }
    }

    /// Prefix shared by every file this job writes.
    pub fn file_prefix(&self) -> String {
        format!("{} ", self.sequence_id)
    }

    /// Folder for downloaded documents inside the working directory.
    pub fn documents_directory(&self) -> PathBuf {
        self.working_directory
            .join(format!("{} Documents", self.sequence_id))
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Replace the display name, moving the final directory with it.
    ///
    /// Returns true when the name actually changed.
    pub fn refine_display_name(&mut self, candidate: &str) -> bool {
        let cleaned = normalize_label(candidate);
        if cleaned.is_empty() || cleaned == self.display_name {
            return false;
        }
        self.display_name = cleaned;
        self.final_directory = final_directory_for(
            &self.archive_root,
            self.sequence_id,
            &self.subject_key,
            &self.display_name,
        );
        true
    }
}

fn final_directory_for(root: &Path, sequence_id: u64, subject_key: &str, name: &str) -> PathBuf {
    root.join(format!(
        "{sequence_id} {} ({})",
        safe_filename(name),
        safe_filename(subject_key)
    ))
}

/// Make `text` usable as a single path component.
///
/// Separators and characters Windows rejects become `_`; an empty result
/// becomes `_`.
pub fn safe_filename(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '/' | '\\' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Collapse whitespace (including NBSP) and drop a trailing colon.
pub fn normalize_label(text: &str) -> String {
    let collapsed = text
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.trim_end_matches(':').trim().to_string()
}

/// Pull a client name out of a details record.
///
/// Details pages title their section `Client Details - <name>`; otherwise a
/// plain `Client Name` field is used.
pub fn derive_display_name(record: &Record) -> Option<String> {
    const DETAILS_PREFIX: &str = "Client Details - ";

    if let Some(key) = record.keys().find(|key| key.starts_with(DETAILS_PREFIX)) {
        return Some(key[DETAILS_PREFIX.len()..].trim().to_string());
    }
    record
        .get("Client Name")
        .filter(|name| !name.trim().is_empty())
        .cloned()
}
