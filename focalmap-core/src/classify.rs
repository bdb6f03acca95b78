//! Existence classification of changed files
//!
//! For every changed non-test file, decide whether a test is known to cover
//! it: a sibling test file changed in the same diff, or one of its method
//! signatures appears in the repository's mapped signature set.

use crate::diff::ChangedFiles;
use crate::export::RepositorySignatureSet;
use crate::language::LanguageParser;
use crate::model::SourceFile;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static TEST_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:test[_-]?(.+)|(.+?)[_-]?test)$").expect("valid regex")
});

/// Test evidence for one changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestState {
    /// No evidence of a test
    NoEvidence,
    /// A matching test file changed in the same diff
    SiblingTestChanged,
    /// At least one method has a mapped test
    MappedTestExists,
}

impl TestState {
    /// Numeric code used in reports: 0, 1 or 2
    pub fn code(self) -> u8 {
        match self {
            TestState::NoEvidence => 0,
            TestState::SiblingTestChanged => 1,
            TestState::MappedTestExists => 2,
        }
    }
}

impl Serialize for TestState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Classification of every changed file in one diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Non-test changed file name to state
    pub states: BTreeMap<String, TestState>,
    /// Changed files that are themselves tests
    pub skipped_tests: Vec<String>,
}

impl Classification {
    pub fn state(&self, name: &str) -> Option<TestState> {
        self.states.get(name).copied()
    }
}

/// Focal base name of a test file name, or `None` if it is not a test name
///
/// `OrderTest.java`, `Order_test.java` and `TestOrder.java` all yield `Order`.
pub fn focal_name_of_test(file_name: &str) -> Option<&str> {
    let stem = file_stem(file_name);
    let caps = TEST_NAME_RE.captures(stem)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Classify every changed file of a repository
///
/// `repo_root` is where changed paths are read from. Files that cannot be
/// located or parsed keep `NoEvidence`.
pub fn classify(
    repo_root: &Path,
    changed: &ChangedFiles,
    signatures: &RepositorySignatureSet,
    parser: &dyn LanguageParser,
) -> Classification {
    let tested_names: HashSet<&str> = changed
        .names
        .iter()
        .filter_map(|name| focal_name_of_test(name))
        .collect();
    let lookup = signatures.lookup();

    let mut result = Classification::default();
    for name in &changed.names {
        if focal_name_of_test(name).is_some() {
            if !result.skipped_tests.contains(name) {
                result.skipped_tests.push(name.clone());
            }
            continue;
        }

        let state = if tested_names.contains(file_stem(name)) {
            TestState::SiblingTestChanged
        } else if has_mapped_method(repo_root, changed, name, &lookup, parser) {
            TestState::MappedTestExists
        } else {
            TestState::NoEvidence
        };
        tracing::debug!(file = %name, state = state.code(), "classified changed file");
        result.states.insert(name.clone(), state);
    }
    result
}

fn has_mapped_method(
    repo_root: &Path,
    changed: &ChangedFiles,
    name: &str,
    lookup: &HashSet<&str>,
    parser: &dyn LanguageParser,
) -> bool {
    let Some(path) = changed.path_for_name(name) else {
        tracing::debug!(file = %name, "no changed path for file name");
        return false;
    };

    let parsed = SourceFile::read(repo_root, path, false)
        .and_then(|file| parser.parse(&file.text, &file.path));
    match parsed {
        Ok(module) => module
            .method_signatures()
            .iter()
            .any(|signature| lookup.contains(signature.as_str())),
        Err(e) => {
            tracing::warn!(file = %path, error = %e, "could not parse changed file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::language::ParsedModule;
    use crate::model::ClassRecord;

    /// Every file declares the same fixed signatures
    struct FixedParser(Vec<&'static str>);

    struct FixedModule(Vec<String>);

    impl ParsedModule for FixedModule {
        fn classes(&self) -> Vec<ClassRecord> {
            Vec::new()
        }

        fn method_signatures(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    impl LanguageParser for FixedParser {
        fn parse(&self, _source: &str, _filename: &str) -> Result<Box<dyn ParsedModule>, ParseError> {
            Ok(Box::new(FixedModule(
                self.0.iter().map(|s| s.to_string()).collect(),
            )))
        }
    }

    fn changed(paths: &[&str]) -> ChangedFiles {
        ChangedFiles {
            paths: paths.iter().map(|s| s.to_string()).collect(),
            names: paths
                .iter()
                .map(|p| p.rsplit('/').next().unwrap_or(p).to_string())
                .collect(),
        }
    }

    fn signatures(list: &[&str]) -> RepositorySignatureSet {
        RepositorySignatureSet {
            repository_name: "shop".to_string(),
            signatures: list.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_focal_name_of_test() {
        assert_eq!(focal_name_of_test("OrderTest.java"), Some("Order"));
        assert_eq!(focal_name_of_test("TestOrder.java"), Some("Order"));
        assert_eq!(focal_name_of_test("order_test.java"), Some("order"));
        assert_eq!(focal_name_of_test("test-order.java"), Some("order"));
        assert_eq!(focal_name_of_test("Order.java"), None);
        assert_eq!(focal_name_of_test("Testament.java"), Some("ament"));
        assert_eq!(focal_name_of_test("Attestation.java"), None);
        assert_eq!(focal_name_of_test("Test.java"), None);
    }

    #[test]
    fn test_sibling_test_changed() {
        let dir = tempfile::tempdir().unwrap();
        let changes = changed(&["src/main/java/Order.java", "src/test/java/OrderTest.java"]);
        let result = classify(dir.path(), &changes, &signatures(&[]), &FixedParser(vec![]));

        assert_eq!(result.state("Order.java"), Some(TestState::SiblingTestChanged));
        assert_eq!(result.state("OrderTest.java"), None);
        assert_eq!(result.skipped_tests, vec!["OrderTest.java"]);
    }

    #[test]
    fn test_mapped_signature_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Invoice.java"), "class Invoice {}").unwrap();

        let changes = changed(&["src/Invoice.java"]);
        let parser = FixedParser(vec!["int total()"]);

        let hit = classify(dir.path(), &changes, &signatures(&["int total()"]), &parser);
        assert_eq!(hit.state("Invoice.java"), Some(TestState::MappedTestExists));

        let miss = classify(dir.path(), &changes, &signatures(&["int sum()"]), &parser);
        assert_eq!(miss.state("Invoice.java"), Some(TestState::NoEvidence));
    }

    #[test]
    fn test_unreadable_file_has_no_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let changes = changed(&["src/Gone.java"]);
        let result = classify(
            dir.path(),
            &changes,
            &signatures(&["int total()"]),
            &FixedParser(vec!["int total()"]),
        );
        assert_eq!(result.state("Gone.java"), Some(TestState::NoEvidence));
    }

    #[test]
    fn test_state_serializes_as_code() {
        let mut result = Classification::default();
        result.states.insert("A.java".to_string(), TestState::MappedTestExists);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"states":{"A.java":2},"skipped_tests":[]}"#);
    }
}
