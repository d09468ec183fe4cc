//! Bounded waits for files dropped into a folder by a download.
//!
//! Extraction collaborators take a snapshot, trigger the download, then wait
//! for a new completed file. Partial files (`.crdownload`) are ignored.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::{sleep, Instant};

use crate::error::{PurgeError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const PARTIAL_SUFFIX: &str = ".crdownload";

/// Names of the regular files currently in `folder` (created if missing).
pub fn snapshot_files(folder: &Path) -> Result<HashSet<String>> {
    fs::create_dir_all(folder)?;
    let mut names = HashSet::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Wait until a completed file not in `previous` appears in `folder`.
///
/// Returns the newest such file, or `DownloadTimeout` once `timeout` has
/// elapsed.
pub async fn wait_for_new_file(
    folder: &Path,
    previous: &HashSet<String>,
    timeout: Duration,
) -> Result<PathBuf> {
    fs::create_dir_all(folder)?;
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(found) = newest_new_file(folder, previous)? {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Err(PurgeError::DownloadTimeout {
                folder: folder.to_path_buf(),
                waited: timeout,
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn newest_new_file(folder: &Path, previous: &HashSet<String>) -> Result<Option<PathBuf>> {
    let mut ready: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_file() || name.ends_with(PARTIAL_SUFFIX) || previous.contains(&name) {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        ready.push((modified, entry.path()));
    }
    Ok(ready.into_iter().max_by_key(|(modified, _)| *modified).map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_detects_new_file() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("old.pdf"), "x").unwrap();
        let before = snapshot_files(temp.path()).unwrap();
        assert!(before.contains("old.pdf"));

        let folder = temp.path().to_path_buf();
        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            fs::write(folder.join("budget.xlsx.crdownload"), "partial").unwrap();
            sleep(Duration::from_millis(100)).await;
            fs::write(folder.join("budget.xlsx"), "done").unwrap();
        });

        let found = wait_for_new_file(temp.path(), &before, Duration::from_secs(5))
            .await
            .unwrap();
        writer.await.unwrap();
        assert_eq!(found, temp.path().join("budget.xlsx"));
    }

    #[tokio::test]
    async fn test_times_out() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("only.crdownload"), "partial").unwrap();
        let before = snapshot_files(temp.path()).unwrap();

        let err = wait_for_new_file(temp.path(), &before, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::DownloadTimeout { .. }));
    }
}
