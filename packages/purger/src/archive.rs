//! Output finalization and archive housekeeping.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{PurgeError, Result};

/// Move a job's working directory to its final name.
///
/// - Same path: nothing to do.
/// - Working directory gone but final present: already finalized, no-op.
/// - Otherwise any existing final directory is removed (the latest purge of
///   a client owns the name) and the working directory is renamed into place.
///   When the rename would cross a file-system boundary the tree is copied
///   and the source deleted instead; that fallback is not atomic.
///
/// Afterwards exactly one of the two paths exists.
pub fn finalize(working: &Path, final_dir: &Path) -> Result<PathBuf> {
    finalize_with(working, final_dir, |from, to| fs::rename(from, to))
}

fn finalize_with<F>(working: &Path, final_dir: &Path, rename: F) -> Result<PathBuf>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let fail = |source: io::Error| PurgeError::Finalize {
        from: working.to_path_buf(),
        to: final_dir.to_path_buf(),
        source,
    };

    if working == final_dir {
        return Ok(final_dir.to_path_buf());
    }

    if !working.exists() {
        if final_dir.exists() {
            debug!("{} already finalized", final_dir.display());
            return Ok(final_dir.to_path_buf());
        }
        return Err(fail(io::Error::new(
            io::ErrorKind::NotFound,
            "neither working nor final directory exists",
        )));
    }

    if final_dir.exists() {
        info!("Replacing previous archive at {}", final_dir.display());
        remove_path(final_dir).map_err(fail)?;
    }
    if let Some(parent) = final_dir.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }

    match rename(working, final_dir) {
        Ok(()) => {}
        Err(e) if is_cross_device(&e) => {
            warn!(
                "Cross-device move from {} to {}; copying instead",
                working.display(),
                final_dir.display()
            );
            copy_dir_all(working, final_dir).map_err(fail)?;
            fs::remove_dir_all(working).map_err(fail)?;
        }
        Err(e) => return Err(fail(e)),
    }

    Ok(final_dir.to_path_buf())
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursively copy `from` into `to`, creating directories as needed.
pub fn copy_dir_all(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Total size of all files below `path`; 0 when it does not exist.
pub fn directory_bytes(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Delete CSV outputs in `dir` that belong to a different sequence.
///
/// Returns the number of files removed.
pub fn purge_foreign_outputs(dir: &Path, prefix: &str) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path.extension().is_some_and(|ext| ext == "csv");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_file() && is_csv && !name.starts_with(prefix) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
