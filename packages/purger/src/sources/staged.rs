//! Staged page exports on local disk.
//!
//! Each client has a folder under the staging root holding one CSV per unit
//! (`Client-Details.csv`, `Notes.csv`, ...) and an optional `documents/`
//! folder. Useful for replaying exports captured elsewhere and for running
//! the whole pipeline without network access.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::downloads::{snapshot_files, wait_for_new_file};
use crate::error::{PurgeError, Result};
use crate::security::credentials::Credentials;
use crate::traits::extractor::{Extractor, SessionProvider};
use crate::types::{
    config::{PurgerConfig, DEFAULT_DOWNLOAD_TIMEOUT},
    context::{normalize_label, safe_filename, JobContext},
    record::{ExtractionUnit, Record},
};

const DOCUMENTS_UNIT: &str = "Documents";
const DOCUMENTS_FOLDER: &str = "documents";

/// Reads a client's staged exports.
#[derive(Debug, Clone)]
pub struct StagedExportSource {
    staging_root: PathBuf,
    download_timeout: Duration,
}

/// Open handle on one client's staging folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSession {
    pub folder: PathBuf,
}

impl StagedExportSource {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    pub fn from_config(config: &PurgerConfig) -> Self {
        Self::new(&config.staging_root).with_download_timeout(config.download_timeout)
    }

    /// Bound on the wait for each copied document to land.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    fn read_unit(&self, session: &StagedSession, unit: &ExtractionUnit) -> Result<Vec<Record>> {
        let path = session.folder.join(format!("{}.csv", unit.file_stem()));
        if !path.exists() {
            return Err(PurgeError::unit(&unit.name, "no staged export"));
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(normalize_label).collect();

        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            let record: Record = headers
                .iter()
                .zip(row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, value)| (header.clone(), value.trim().to_string()))
                .collect();
            if !record.is_empty() {
                rows.push(record);
            }
        }
        Ok(rows)
    }

    async fn deliver_documents(&self, session: &StagedSession, ctx: &JobContext) -> Result<Vec<Record>> {
        let source = session.folder.join(DOCUMENTS_FOLDER);
        if !source.is_dir() {
            debug!(folder = %source.display(), "No staged documents");
            return Ok(Vec::new());
        }

        let target = ctx.documents_directory();
        let mut delivered = Vec::new();
        for entry in fs::read_dir(&source)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();

            // Drop a copy left by an earlier attempt at this sequence.
            let destination = target.join(&name);
            if destination.exists() {
                fs::remove_file(&destination)?;
            }
            let before = snapshot_files(&target)?;
            fs::copy(entry.path(), &destination)?;
            match wait_for_new_file(&target, &before, self.download_timeout).await {
                Ok(path) => {
                    let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    let mut row = Record::new();
                    row.insert("Document".to_string(), name);
                    row.insert("Bytes".to_string(), bytes.to_string());
                    delivered.push(row);
                }
                Err(e) => warn!(document = %name, error = %e, "Document omitted"),
            }
        }
        Ok(delivered)
    }
}

#[async_trait]
impl SessionProvider for StagedExportSource {
    type Session = StagedSession;

    async fn acquire(&self, credentials: &Credentials, ctx: &JobContext) -> Result<StagedSession> {
        let (username, _) = credentials.ensure()?;
        let folder = self.staging_root.join(safe_filename(&ctx.subject_key));
        if !folder.is_dir() {
            return Err(PurgeError::Session(format!(
                "no staged exports for client {} under {}",
                ctx.subject_key,
                self.staging_root.display()
            )));
        }
        debug!(user = %username, folder = %folder.display(), "Opened staged session");
        Ok(StagedSession { folder })
    }

    async fn release(&self, session: StagedSession) {
        debug!(folder = %session.folder.display(), "Closed staged session");
    }
}

#[async_trait]
impl Extractor<StagedSession> for StagedExportSource {
    async fn extract(
        &self,
        session: &mut StagedSession,
        unit: &ExtractionUnit,
        ctx: &JobContext,
    ) -> Result<Vec<Record>> {
        if unit.name == DOCUMENTS_UNIT {
            return self.deliver_documents(session, ctx).await;
        }
        self.read_unit(session, unit)
    }
}
