//! Runtime configuration loaded from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PurgeError, Result};
use crate::security::credentials::Credentials;

/// Default wait for a single download before it is abandoned.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Operator recorded when nobody identifies themselves.
pub const DEFAULT_OPERATOR: &str = "Operator Zero";

const LEDGER_FILE: &str = "purger_state.json";
const DUPLICATE_REPORTS_DIR: &str = "_duplicate_reports";
const STAGING_DIR: &str = "staging";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct PurgerConfig {
    /// Root folder holding every finalized client archive
    pub archive_root: PathBuf,

    /// Folder holding the persisted ledger
    pub state_dir: PathBuf,

    /// Root of staged page exports read by the offline source; kept out of
    /// the archive root so a reset leaves inputs alone
    pub staging_root: PathBuf,

    /// Manifest used by batch runs when none is given explicitly
    pub default_manifest: Option<PathBuf>,

    /// Default operator name
    pub operator: String,

    pub credentials: Credentials,

    pub download_timeout: Duration,
}

impl PurgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let archive_root = non_empty("PURGED_ARCHIVE_ROOT")
            .map(|v| expand_home(&v, &home))
            .unwrap_or_else(|| home.join("PurgedClients"));
        let state_dir = non_empty("PURGER_STATE_DIR")
            .map(|v| expand_home(&v, &home))
            .unwrap_or_else(|| home.join(".turnpoint_purger"));
        let staging_root = non_empty("PURGER_STAGING_ROOT")
            .map(|v| expand_home(&v, &home))
            .unwrap_or_else(|| state_dir.join(STAGING_DIR));

        let download_timeout = match non_empty("PURGER_DOWNLOAD_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    PurgeError::Config(format!(
                        "PURGER_DOWNLOAD_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                    ))
                })?,
            None => DEFAULT_DOWNLOAD_TIMEOUT,
        };

        Ok(Self {
            archive_root,
            state_dir,
            staging_root,
            default_manifest: non_empty("PURGER_MANIFEST").map(|v| expand_home(&v, &home)),
            operator: non_empty("TP_OPERATOR")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_OPERATOR.to_string()),
            credentials: Credentials::from_parts(non_empty("TP_USERNAME"), non_empty("TP_PASSWORD")),
            download_timeout,
        })
    }

    /// Path of the persisted ledger document.
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir.join(LEDGER_FILE)
    }

    /// Folder receiving duplicate notices.
    pub fn duplicate_reports_dir(&self) -> PathBuf {
        self.archive_root.join(DUPLICATE_REPORTS_DIR)
    }
}

fn expand_home(raw: &str, home: &Path) -> PathBuf {
    let raw = raw.trim();
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None if raw == "~" => home.to_path_buf(),
        None => PathBuf::from(raw),
    }
}

/// How a job reacts to a client that was already purged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicatePolicy {
    /// Rerun regardless of prior records
    pub allow_duplicate: bool,

    /// Ask the operator before rerunning
    pub prompt: bool,
}

impl DuplicatePolicy {
    /// Refuse duplicates without asking.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Always rerun.
    pub fn overriding() -> Self {
        Self {
            allow_duplicate: true,
            prompt: false,
        }
    }

    /// Ask the operator.
    pub fn interactive() -> Self {
        Self {
            allow_duplicate: false,
            prompt: true,
        }
    }
}
