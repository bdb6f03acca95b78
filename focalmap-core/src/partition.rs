//! Candidate partitioning
//!
//! Splits a repository inventory into test files and focal candidates. Each
//! focal candidate carries its original path (used for reading) together with
//! the lower-cased form used for matching.

use crate::discover::FileInventory;

/// A file that may hold focal classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocalCandidate {
    /// Repository-relative path in its original case
    pub path: String,
    /// Lower-cased path, compared against normalized test paths
    pub normalized: String,
}

impl FocalCandidate {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let normalized = path.to_lowercase();
        FocalCandidate { path, normalized }
    }
}

/// Test files and focal candidates of one repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub test_files: Vec<String>,
    pub focal_candidates: Vec<FocalCandidate>,
}

/// Split `inventory` into test files and focal candidates
///
/// A focal candidate is any non-test file outside the test source segment. The
/// test flag wins over location: a flagged file under `src/main` is never a
/// focal candidate.
pub fn partition(inventory: &FileInventory, test_source_dir: &str) -> Partition {
    let test_files: Vec<String> = inventory.test_files().map(str::to_string).collect();
    let focal_candidates = inventory
        .paths()
        .filter(|path| !inventory.is_test(path))
        .filter(|path| !has_segment(&path.to_lowercase(), &test_source_dir.to_lowercase()))
        .map(FocalCandidate::new)
        .collect();

    Partition {
        test_files,
        focal_candidates,
    }
}

/// Whether `path` contains `segment` as whole directory components
///
/// The segment may sit at the start of the path or after a `/`.
pub fn has_segment(path: &str, segment: &str) -> bool {
    let anchored = format!("/{}", path);
    anchored.contains(&format!("/{}/", segment))
}

/// Replace every whole-component occurrence of `from` with `to`
pub fn replace_segment(path: &str, from: &str, to: &str) -> String {
    let anchored = format!("/{}", path);
    let replaced = anchored.replace(&format!("/{}/", from), &format!("/{}/", to));
    replaced[1..].to_string()
}
