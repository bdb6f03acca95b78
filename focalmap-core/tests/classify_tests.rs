//! Integration tests for changed-file classification

use focalmap_core::language::{create_parser, Language};
use focalmap_core::{
    classify, map_and_export, ChangedFiles, RepoSpec, RepositorySignatureSet, TestState,
};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn shop_changes() -> ChangedFiles {
    ChangedFiles::read(&fixture_path("shop.diff"), "java").unwrap()
}

fn signatures(list: &[&str]) -> RepositorySignatureSet {
    RepositorySignatureSet {
        repository_name: "shop".to_string(),
        signatures: list.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn test_diff_fixture_names_and_paths() {
    let changed = shop_changes();
    assert_eq!(
        changed.names,
        vec!["Order.java", "OrderTest.java", "Invoice.java", "Receipt.java"]
    );
    assert_eq!(changed.paths.len(), 4);
    assert_eq!(changed.paths[2], "src/main/java/com/shop/Invoice.java");
}

#[test]
fn test_classify_shop_diff() {
    let parser = create_parser(Language::Java, &["Test".to_string()]).unwrap();
    let result = classify(
        &fixture_path("shop"),
        &shop_changes(),
        &signatures(&["int add(int a, int b)", "int total()"]),
        parser.as_ref(),
    );

    assert_eq!(result.skipped_tests, vec!["OrderTest.java"]);
    assert_eq!(result.state("OrderTest.java"), None);
    assert_eq!(result.state("Order.java"), Some(TestState::SiblingTestChanged));
    assert_eq!(result.state("Invoice.java"), Some(TestState::MappedTestExists));
    assert_eq!(result.state("Receipt.java"), Some(TestState::NoEvidence));
}

#[test]
fn test_classify_without_mapping_has_no_evidence() {
    let parser = create_parser(Language::Java, &["Test".to_string()]).unwrap();
    let result = classify(
        &fixture_path("shop"),
        &shop_changes(),
        &signatures(&[]),
        parser.as_ref(),
    );
    assert_eq!(result.state("Invoice.java"), Some(TestState::NoEvidence));
    assert_eq!(result.state("Order.java"), Some(TestState::SiblingTestChanged));
}

#[test]
fn test_classify_empty_diff() {
    let parser = create_parser(Language::Java, &["Test".to_string()]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let changed = ChangedFiles::read(&dir.path().join("diff.txt"), "java").unwrap();
    let result = classify(dir.path(), &changed, &signatures(&[]), parser.as_ref());
    assert!(result.states.is_empty());
    assert!(result.skipped_tests.is_empty());
}

#[test]
fn test_classify_against_written_artifact() {
    let out = tempfile::tempdir().unwrap();
    let spec = RepoSpec {
        name: "shop".to_string(),
        path: fixture_path("shop"),
    };
    let report = map_and_export(&spec, out.path(), None).unwrap();
    let artifact = report.artifact.expect("shop maps at least one method");

    let loaded = RepositorySignatureSet::load(&artifact, "shop").unwrap();
    let lookup = loaded.lookup();
    assert!(lookup.contains("void addItem(String item, int price)"));
    assert!(!lookup.contains("int total()"), "addItem is the only evidence for Order");

    // Order.java changes alone; its addItem has a final, multi-line parameter list
    let changed = ChangedFiles::read(&fixture_path("order.diff"), "java").unwrap();
    assert_eq!(changed.names, vec!["Order.java"]);

    let parser = create_parser(Language::Java, &["Test".to_string()]).unwrap();
    let result = classify(&fixture_path("shop"), &changed, &loaded, parser.as_ref());
    assert_eq!(result.state("Order.java"), Some(TestState::MappedTestExists));
    assert!(result.skipped_tests.is_empty());
}
