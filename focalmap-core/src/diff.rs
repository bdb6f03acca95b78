//! Changed-file extraction from unified `git diff` output

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static DIFF_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)[ab]/(\S+)").expect("valid regex"));

/// Files touched by a diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFiles {
    /// Repository-relative paths, first-seen order, no duplicates
    pub paths: Vec<String>,
    /// Base names from the `diff --git` headers, one per header
    pub names: Vec<String>,
}

impl ChangedFiles {
    /// Parse diff text, keeping files with the given extension (no dot)
    pub fn from_diff(diff: &str, extension: &str) -> Self {
        let suffix = format!(".{}", extension);

        let mut seen = HashSet::new();
        let paths = DIFF_PATH_RE
            .captures_iter(diff)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|path| path.ends_with(&suffix))
            .filter(|path| seen.insert(*path))
            .map(str::to_string)
            .collect();

        let names = diff
            .lines()
            .filter(|line| line.starts_with("diff --git"))
            .map(str::trim_end)
            .filter(|line| line.ends_with(&suffix))
            .filter_map(|line| line.rsplit(['/', ' ']).next())
            .map(str::to_string)
            .collect();

        ChangedFiles { paths, names }
    }

    /// Read and parse a diff file
    ///
    /// A missing file is an empty change set.
    pub fn read(path: &Path, extension: &str) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no diff file; no changed files");
            return Ok(Self::default());
        }
        let diff = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read diff file: {}", path.display()))?;
        Ok(Self::from_diff(&diff, extension))
    }

    /// First changed path whose base name is `name`
    pub fn path_for_name(&self, name: &str) -> Option<&str> {
        self.paths
            .iter()
            .map(String::as_str)
            .find(|path| *path == name || path.ends_with(&format!("/{}", name)))
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.names.is_empty()
    }
}
