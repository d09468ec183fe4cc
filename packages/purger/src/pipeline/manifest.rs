//! Client manifests and batch queue selection.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::error::{PurgeError, Result};

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub subject_key: String,
    pub display_name: Option<String>,
    pub package: Option<String>,
}

impl ManifestEntry {
    pub fn new(subject_key: impl Into<String>) -> Self {
        Self {
            subject_key: subject_key.into(),
            display_name: None,
            package: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = non_empty(name.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = non_empty(package.into());
        self
    }

    /// Package label for log lines.
    pub fn package_label(&self) -> &str {
        self.package.as_deref().unwrap_or("Unlabelled Package")
    }
}

/// Load a manifest CSV from disk.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    if !path.exists() {
        return Err(PurgeError::Manifest(format!(
            "client manifest not found at {}",
            path.display()
        )));
    }
    let file = std::fs::File::open(path)?;
    parse_manifest(file).map_err(|e| match e {
        PurgeError::Manifest(reason) => {
            PurgeError::Manifest(format!("{} ({})", reason, path.display()))
        }
        other => other,
    })
}

/// Parse manifest rows, keeping file order.
///
/// Header names are trimmed and lowercased. The id column may be called
/// `client_id`, `turnpoint_id` or `client`; rows without an id are skipped.
pub fn parse_manifest<R: Read>(reader: R) -> Result<Vec<ManifestEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(PurgeError::Manifest("manifest has no headers".into()));
    }

    let column = |names: &[&str]| -> Vec<usize> {
        names
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == name))
            .collect()
    };
    let id_columns = column(&["client_id", "turnpoint_id", "client"]);
    let name_columns = column(&["client_name", "name"]);
    let package_columns = column(&["package"]);

    let mut entries = Vec::new();
    for row in reader.records() {
        let row = row?;
        let first = |columns: &[usize]| -> Option<String> {
            columns
                .iter()
                .filter_map(|&i| row.get(i))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        };

        let Some(subject_key) = first(&id_columns) else {
            continue;
        };
        entries.push(ManifestEntry {
            subject_key,
            display_name: first(&name_columns),
            package: first(&package_columns),
        });
    }

    if entries.is_empty() {
        return Err(PurgeError::Manifest("no clients discovered in manifest".into()));
    }
    Ok(entries)
}

/// Split repeated and comma-separated `--package` values.
pub fn parse_package_args<I, T>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|raw| {
            raw.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Entries whose package matches a filter, in filter order, each client once.
pub fn select_by_packages(entries: &[ManifestEntry], packages: &[String]) -> Vec<ManifestEntry> {
    if packages.is_empty() {
        return entries.to_vec();
    }

    let mut seen = HashSet::new();
    let mut selection = Vec::new();
    for target in packages.iter().map(|p| normalize_package(p)) {
        let before = selection.len();
        for entry in entries {
            let package = normalize_package(entry.package.as_deref().unwrap_or(""));
            if package == target && !seen.contains(&entry.subject_key) {
                seen.insert(entry.subject_key.clone());
                selection.push(entry.clone());
            }
        }
        if selection.len() == before {
            info!("No manifest entries matched package '{}'.", target);
        }
    }
    selection
}

/// Build the ordered queue for a batch run.
///
/// Either `packages` must select at least one client, or `include_all` must
/// be set.
pub fn build_batch_queue(
    entries: Vec<ManifestEntry>,
    packages: &[String],
    include_all: bool,
) -> Result<Vec<ManifestEntry>> {
    if !packages.is_empty() {
        let selected = select_by_packages(&entries, packages);
        if selected.is_empty() {
            return Err(PurgeError::Manifest(
                "No clients matched the requested package filters.".into(),
            ));
        }
        return Ok(selected);
    }
    if include_all {
        return Ok(entries);
    }
    Err(PurgeError::Manifest(
        "A batch run requires either --package filters or --all-clients.".into(),
    ))
}

fn normalize_package(value: &str) -> String {
    value.trim().to_lowercase()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MANIFEST: &str = "\
 Client_ID , Client_Name,Package
56851,KHAIR Adam,Core Supports
,Nobody,Core Supports
777,Jane Doe,capacity building
901,,CORE SUPPORTS
";

    fn ids(entries: &[ManifestEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.subject_key.as_str()).collect()
    }

    #[test]
    fn test_parse_normalizes_headers_and_skips_blank_ids() {
        let entries = parse_manifest(MANIFEST.as_bytes()).unwrap();
        assert_eq!(ids(&entries), vec!["56851", "777", "901"]);
        assert_eq!(entries[0].display_name.as_deref(), Some("KHAIR Adam"));
        assert_eq!(entries[2].display_name, None);
        assert_eq!(entries[2].package_label(), "CORE SUPPORTS");
    }

    #[test]
    fn test_parse_accepts_aliases() {
        let entries = parse_manifest("TurnPoint_ID,name\n12,Sam\n".as_bytes()).unwrap();
        assert_eq!(entries, vec![ManifestEntry::new("12").with_display_name("Sam")]);
        assert_eq!(entries[0].package_label(), "Unlabelled Package");

        let entries = parse_manifest("client\n34\n".as_bytes()).unwrap();
        assert_eq!(ids(&entries), vec!["34"]);
    }

    #[test]
    fn test_parse_rejects_empty_manifests() {
        assert!(matches!(
            parse_manifest("".as_bytes()),
            Err(PurgeError::Manifest(_))
        ));
        assert!(matches!(
            parse_manifest("client_id,package\n,Core\n".as_bytes()),
            Err(PurgeError::Manifest(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempdir().unwrap();
        let err = load_manifest(&temp.path().join("absent.csv")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("clients.csv");
        std::fs::write(&path, MANIFEST).unwrap();
        assert_eq!(load_manifest(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_package_args() {
        let packages = parse_package_args(["Core Supports, Capacity Building", "", " ,x"]);
        assert_eq!(packages, vec!["Core Supports", "Capacity Building", "x"]);
    }

    #[test]
    fn test_selection_follows_filter_order_without_repeats() {
        let entries = parse_manifest(MANIFEST.as_bytes()).unwrap();
        let selected = select_by_packages(
            &entries,
            &parse_package_args(["Capacity Building,core supports,Core Supports"]),
        );
        assert_eq!(ids(&selected), vec!["777", "56851", "901"]);
    }

    #[test]
    fn test_build_batch_queue() {
        let entries = parse_manifest(MANIFEST.as_bytes()).unwrap();

        let all = build_batch_queue(entries.clone(), &[], true).unwrap();
        assert_eq!(all.len(), 3);

        let err = build_batch_queue(entries.clone(), &[], false).unwrap_err();
        assert!(err.to_string().contains("--all-clients"));

        let err = build_batch_queue(entries.clone(), &["Respite".to_string()], true).unwrap_err();
        assert!(err.to_string().contains("No clients matched"));

        let core = build_batch_queue(entries, &["core supports".to_string()], false).unwrap();
        assert_eq!(ids(&core), vec!["56851", "901"]);
    }
}
