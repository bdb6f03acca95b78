//! Repository file discovery
//!
//! Walks a repository and flags every source file that contains the test
//! marker. The result is the `{ path -> is_test }` inventory the partitioner
//! consumes.

use crate::config::ResolvedConfig;
use crate::error::DiscoveryError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Source files of one repository keyed by repository-relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInventory {
    files: BTreeMap<String, bool>,
}

impl FileInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file; re-inserting a path overwrites its flag
    pub fn insert(&mut self, path: impl Into<String>, is_test: bool) {
        self.files.insert(path.into(), is_test);
    }

    /// Every discovered path, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Paths flagged as test files, sorted
    pub fn test_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, is_test)| **is_test)
            .map(|(path, _)| path.as_str())
    }

    pub fn is_test(&self, path: &str) -> bool {
        self.files.get(path).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn test_count(&self) -> usize {
        self.test_files().count()
    }
}

impl FromIterator<(String, bool)> for FileInventory {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        FileInventory {
            files: iter.into_iter().collect(),
        }
    }
}

/// Walk `root` and flag files containing the configured test marker
///
/// Fails with `NoTestFiles` when nothing carries the marker, since a
/// repository without tests cannot produce a single mapping.
pub fn discover(root: &Path, config: &ResolvedConfig) -> Result<FileInventory, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::MissingRoot(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    collect_files_recursive(root, &mut paths)?;

    let mut inventory = FileInventory::new();
    for path in paths {
        let Some(relative) = relative_path(root, &path) else {
            continue;
        };
        if !config.should_include(&relative) {
            continue;
        }
        let is_test = contains_marker(&path, &config.test_marker);
        inventory.insert(relative, is_test);
    }

    tracing::debug!(
        root = %root.display(),
        files = inventory.len(),
        tests = inventory.test_count(),
        "discovered source files"
    );

    if inventory.test_count() == 0 {
        return Err(DiscoveryError::NoTestFiles(root.to_path_buf()));
    }
    Ok(inventory)
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "build"
        || name == "out"
        || name == "target"
}

/// Recursively collect regular files, skipping symlinks and build output
fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    let walk_error = |source| DiscoveryError::Walk {
        path: dir.to_path_buf(),
        source,
    };

    for entry_result in std::fs::read_dir(dir).map_err(walk_error)? {
        let entry = entry_result.map_err(walk_error)?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path).map_err(|source| DiscoveryError::Walk {
            path: path.clone(),
            source,
        })?;

        if metadata.is_symlink() {
            continue;
        }
        if metadata.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_skipped_dir);
            if !skipped {
                collect_files_recursive(&path, files)?;
            }
        } else if metadata.is_file() {
            files.push(path);
        }
    }

    Ok(())
}

/// `/`-separated path of `path` relative to `root`
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Whether any line of the file contains `marker`
///
/// Unreadable files are logged and treated as non-test files.
fn contains_marker(path: &Path, marker: &str) -> bool {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .lines()
            .any(|line| line.contains(marker)),
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file during marker scan");
            false
        }
    }
}
