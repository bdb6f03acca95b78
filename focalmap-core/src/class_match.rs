//! Test file to focal file matching by normalized path

use crate::partition::{replace_segment, FocalCandidate};
use std::collections::HashMap;

/// A test file paired with the focal file it is believed to test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPair {
    pub test_file: String,
    pub focal_file: String,
}

/// Normalize a test path into the focal path it should correspond to
///
/// Lower-cases, moves the test source segment to the main source segment and
/// removes every `test` substring.
pub fn normalize_test_path(path: &str, test_source_dir: &str, main_source_dir: &str) -> String {
    let lowered = path.to_lowercase();
    let moved = replace_segment(
        &lowered,
        &test_source_dir.to_lowercase(),
        &main_source_dir.to_lowercase(),
    );
    moved.replace("test", "")
}

/// Pair each test file with at most one focal candidate
///
/// Pairs come out in test-file order. Unmatched test files are dropped; the
/// caller counts them.
pub fn match_classes(
    test_files: &[String],
    focal_candidates: &[FocalCandidate],
    test_source_dir: &str,
    main_source_dir: &str,
) -> Vec<ClassPair> {
    // First candidate with a given normalized path wins
    let mut by_normalized: HashMap<&str, &str> = HashMap::with_capacity(focal_candidates.len());
    for candidate in focal_candidates {
        by_normalized
            .entry(candidate.normalized.as_str())
            .or_insert(candidate.path.as_str());
    }

    test_files
        .iter()
        .filter_map(|test_file| {
            let normalized = normalize_test_path(test_file, test_source_dir, main_source_dir);
            match by_normalized.get(normalized.as_str()) {
                Some(focal) => Some(ClassPair {
                    test_file: test_file.clone(),
                    focal_file: focal.to_string(),
                }),
                None => {
                    tracing::debug!(test_file = %test_file, expected = %normalized, "no focal file");
                    None
                }
            }
        })
        .collect()
}
