//! Integration tests for repository mapping

use focalmap_core::config::ResolvedConfig;
use focalmap_core::language::{create_parser, Language};
use focalmap_core::pipeline::{map_and_export, map_repositories, map_repository, read_manifest};
use focalmap_core::{RepoSpec, RepositorySignatureSet};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn map_shop() -> focalmap_core::RepositoryMapping {
    let config = ResolvedConfig::defaults().unwrap();
    let parser = create_parser(Language::Java, &config.test_annotations).unwrap();
    map_repository(&fixture_path("shop"), &config, parser.as_ref()).unwrap()
}

#[test]
fn test_shop_statistics() {
    let stats = map_shop().stats;
    assert_eq!(stats.source_files, 7);
    assert_eq!(stats.test_classes, 3);
    assert_eq!(stats.focal_candidates, 4);
    assert_eq!(stats.mapped_test_classes, 2, "HelperTest has no focal class");
    assert_eq!(stats.test_cases, 4);
    assert_eq!(stats.mapped_test_cases, 3);
    assert_eq!(stats.mapped_by_name, 2);
    assert_eq!(stats.mapped_by_invocation, 1);
    assert_eq!(stats.ambiguous_test_cases, 1);
    assert_eq!(stats.parse_failures, 0);
}

#[test]
fn test_name_heuristic_maps_test_add() {
    let mapping = map_shop();
    let pair = mapping
        .pairs
        .iter()
        .find(|p| p.test_case.identifier == "testAdd")
        .expect("testAdd should be mapped");
    assert_eq!(pair.focal_method.identifier, "add");
    assert_eq!(pair.focal_method.signature, "int add(int a, int b)");
    assert_eq!(pair.test_class, "src/test/java/com/shop/CalculatorTest.java");
    assert_eq!(pair.focal_class, "src/main/java/com/shop/Calculator.java");
}

#[test]
fn test_unique_invocation_maps_check_sum() {
    let mapping = map_shop();
    let pair = mapping
        .pairs
        .iter()
        .find(|p| p.test_case.identifier == "checkSum")
        .expect("checkSum should be mapped");
    assert_eq!(pair.focal_method.signature, "int sum()");
}

#[test]
fn test_ambiguous_invocation_is_not_mapped() {
    let mapping = map_shop();
    assert!(mapping
        .pairs
        .iter()
        .all(|p| p.test_case.identifier != "checkValue"));
}

#[test]
fn test_exported_signatures_first_seen_order() {
    let set = map_shop().signature_set("shop");
    assert_eq!(
        set.signatures,
        vec![
            "int add(int a, int b)",
            "int sum()",
            "void addItem(String item, int price)",
        ]
    );
}

#[test]
fn test_mapping_is_deterministic() {
    let first = map_shop().signature_set("shop");
    let second = map_shop().signature_set("shop");
    assert_eq!(first, second);
}

#[test]
fn test_map_and_export_writes_artifact_once() {
    let out = tempfile::tempdir().unwrap();
    let spec = RepoSpec {
        name: "shop".to_string(),
        path: fixture_path("shop"),
    };

    let report = map_and_export(&spec, out.path(), None).unwrap();
    assert!(report.skipped.is_none());
    assert_eq!(report.signatures, 3);

    let artifact = out.path().join("shop").join("shop_signature.json");
    assert_eq!(report.artifact.as_deref(), Some(artifact.as_path()));

    let loaded = RepositorySignatureSet::load(&artifact, "shop").unwrap();
    assert_eq!(loaded.repository_name, "shop");
    assert!(loaded.lookup().contains("int sum()"));
}

#[test]
fn test_batch_manifest_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("repos.json");
    let shop = fixture_path("shop");
    std::fs::write(
        &manifest,
        serde_json::json!([
            { "name": "gone", "path": "does-not-exist" },
            { "name": "shop", "path": shop },
        ])
        .to_string(),
    )
    .unwrap();

    let specs = read_manifest(&manifest).unwrap();
    let out = dir.path().join("out");
    let reports = map_repositories(&specs, &out, None, Some(2)).unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports[0].skipped.is_some());
    assert_eq!(reports[1].repository_name, "shop");
    assert_eq!(reports[1].stats.mapped_test_cases, 3);
    assert!(out.join("shop").join("shop_signature.json").exists());
    assert!(!out.join("gone").exists());
}
