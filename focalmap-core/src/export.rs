//! Mapping export
//!
//! Flattens the mapped pairs of a repository into the de-duplicated list of
//! focal signatures that downstream consumers test membership against.

use crate::model::MappedPair;
use crate::signature::normalize_signature;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Signatures of every focal method mapped by at least one test case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySignatureSet {
    pub repository_name: String,
    /// Normalized signatures in first-seen order, no duplicates
    pub signatures: Vec<String>,
}

/// Persisted forms accepted when loading
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredArtifact {
    Object(RepositorySignatureSet),
    List(Vec<String>),
}

impl RepositorySignatureSet {
    pub fn empty(repository_name: impl Into<String>) -> Self {
        RepositorySignatureSet {
            repository_name: repository_name.into(),
            signatures: Vec::new(),
        }
    }

    /// Collect focal signatures from `pairs`, keeping the first occurrence
    pub fn from_pairs<'a>(
        repository_name: impl Into<String>,
        pairs: impl IntoIterator<Item = &'a MappedPair>,
    ) -> Self {
        let mut seen = HashSet::new();
        let signatures = pairs
            .into_iter()
            .map(|pair| normalize_signature(&pair.focal_method.signature))
            .filter(|signature| seen.insert(signature.clone()))
            .collect();
        RepositorySignatureSet {
            repository_name: repository_name.into(),
            signatures,
        }
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Membership index for repeated lookups
    pub fn lookup(&self) -> HashSet<&str> {
        self.signatures.iter().map(String::as_str).collect()
    }

    /// `<output_dir>/<name>/<name>_signature.json`
    pub fn artifact_path(output_dir: &Path, repository_name: &str) -> PathBuf {
        output_dir
            .join(repository_name)
            .join(format!("{}_signature.json", repository_name))
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize signature set")
    }

    /// Write the artifact under `output_dir` in one atomic step
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = Self::artifact_path(output_dir, &self.repository_name);
        let json = self.to_json()?;
        atomic_write(&path, &json)?;
        Ok(path)
    }

    /// Load a persisted artifact
    ///
    /// Accepts the object form and a bare list of signatures. A missing file
    /// loads as an empty set named `repository_name`.
    pub fn load(path: &Path, repository_name: &str) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no signature artifact; treating as empty");
            return Ok(Self::empty(repository_name));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read signature artifact: {}", path.display()))?;
        let stored: StoredArtifact = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse signature artifact: {}", path.display()))?;

        Ok(match stored {
            StoredArtifact::Object(set) => set,
            StoredArtifact::List(signatures) => RepositorySignatureSet {
                repository_name: repository_name.to_string(),
                signatures,
            },
        })
    }
}

/// Write data to file atomically using temp file + rename
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    use std::fs;
    use std::io::Write;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write to temp file: {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync temp file: {}", temp_path.display()))?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
