//! Repository mapping pipeline with Rayon-based parallelism
//!
//! discover -> partition -> class matching -> per-pair method matching ->
//! export. Class pairs are independent and processed in parallel; results are
//! flattened in class-pair order so signature order is reproducible.

use crate::class_match::{match_classes, ClassPair};
use crate::config::{self, ResolvedConfig};
use crate::discover::{discover, FileInventory};
use crate::error::DiscoveryError;
use crate::export::RepositorySignatureSet;
use crate::language::{create_parser, LanguageParser};
use crate::method_match::{match_methods, MethodMatchCounts};
use crate::model::{ClassRecord, MappedPair, MethodRecord, SourceFile};
use crate::partition::partition;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Aggregate counters for one repository run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MappingStats {
    pub source_files: usize,
    pub test_classes: usize,
    pub focal_candidates: usize,
    pub mapped_test_classes: usize,
    pub test_cases: usize,
    pub mapped_test_cases: usize,
    pub mapped_by_name: usize,
    pub mapped_by_invocation: usize,
    pub ambiguous_test_cases: usize,
    pub parse_failures: usize,
}

impl MappingStats {
    fn absorb(&mut self, counts: &MethodMatchCounts, parse_failures: usize) {
        self.test_cases += counts.test_cases;
        self.mapped_test_cases += counts.mapped();
        self.mapped_by_name += counts.by_name;
        self.mapped_by_invocation += counts.by_invocation;
        self.ambiguous_test_cases += counts.ambiguous;
        self.parse_failures += parse_failures;
    }
}

/// Mapped pairs and statistics of one repository
#[derive(Debug, Clone, Default)]
pub struct RepositoryMapping {
    pub pairs: Vec<MappedPair>,
    pub stats: MappingStats,
}

impl RepositoryMapping {
    pub fn signature_set(&self, repository_name: &str) -> RepositorySignatureSet {
        RepositorySignatureSet::from_pairs(repository_name, &self.pairs)
    }
}

struct PairResult {
    pairs: Vec<MappedPair>,
    counts: MethodMatchCounts,
    parse_failures: usize,
}

/// Discover and map one repository
///
/// Only discovery failures escape; per-file failures are counted.
pub fn map_repository(
    root: &Path,
    config: &ResolvedConfig,
    parser: &dyn LanguageParser,
) -> Result<RepositoryMapping, DiscoveryError> {
    let inventory = discover(root, config)?;
    Ok(map_inventory(root, &inventory, config, parser))
}

/// Map an already classified file inventory
pub fn map_inventory(
    root: &Path,
    inventory: &FileInventory,
    config: &ResolvedConfig,
    parser: &dyn LanguageParser,
) -> RepositoryMapping {
    let split = partition(inventory, &config.test_source_dir);
    let class_pairs = match_classes(
        &split.test_files,
        &split.focal_candidates,
        &config.test_source_dir,
        &config.main_source_dir,
    );

    let mut stats = MappingStats {
        source_files: inventory.len(),
        test_classes: split.test_files.len(),
        focal_candidates: split.focal_candidates.len(),
        mapped_test_classes: class_pairs.len(),
        ..MappingStats::default()
    };
    tracing::info!(
        root = %root.display(),
        source_files = stats.source_files,
        test_classes = stats.test_classes,
        focal_candidates = stats.focal_candidates,
        mapped_test_classes = stats.mapped_test_classes,
        "matched test classes"
    );

    let results: Vec<PairResult> = class_pairs
        .par_iter()
        .map(|pair| map_class_pair(root, pair, parser))
        .collect();

    let mut pairs = Vec::new();
    for result in results {
        stats.absorb(&result.counts, result.parse_failures);
        pairs.extend(result.pairs);
    }

    tracing::info!(
        root = %root.display(),
        test_cases = stats.test_cases,
        mapped_test_cases = stats.mapped_test_cases,
        parse_failures = stats.parse_failures,
        "mapped test cases"
    );
    RepositoryMapping { pairs, stats }
}

fn map_class_pair(root: &Path, pair: &ClassPair, parser: &dyn LanguageParser) -> PairResult {
    tracing::debug!(test = %pair.test_file, focal = %pair.focal_file, "mapping class pair");

    let mut parse_failures = 0;
    let mut methods = |path: &str, is_test: bool| {
        role_methods(root, path, is_test, parser).unwrap_or_else(|| {
            parse_failures += 1;
            Vec::new()
        })
    };
    let test_methods = methods(&pair.test_file, true);
    let focal_methods = methods(&pair.focal_file, false);

    let (pairs, counts) = match_methods(
        &pair.test_file,
        &test_methods,
        &pair.focal_file,
        &focal_methods,
    );
    PairResult {
        pairs,
        counts,
        parse_failures,
    }
}

/// Methods a file contributes to its class pair; `None` if it cannot be parsed
///
/// A test file contributes its test cases, any other file its focal
/// candidates. Every class declared in the file takes part.
fn role_methods(
    root: &Path,
    path: &str,
    is_test: bool,
    parser: &dyn LanguageParser,
) -> Option<Vec<MethodRecord>> {
    let file = match SourceFile::read(root, path, is_test) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(file = %path, error = %e, "skipping unreadable file");
            return None;
        }
    };
    let classes = match parser.parse(&file.text, &file.path) {
        Ok(module) => module.classes(),
        Err(e) => {
            tracing::warn!(file = %path, error = %e, "skipping unparseable file");
            return None;
        }
    };

    let methods = if file.is_test {
        classes
            .iter()
            .flat_map(ClassRecord::test_cases)
            .cloned()
            .collect()
    } else {
        classes
            .iter()
            .flat_map(ClassRecord::focal_candidates)
            .cloned()
            .collect()
    };
    Some(methods)
}

/// One repository listed in a batch manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSpec {
    pub name: String,
    pub path: PathBuf,
}

/// Read a JSON list of `{ "name", "path" }` entries
///
/// Relative paths are resolved against the manifest's directory. Names must be
/// unique since each one owns an artifact path.
pub fn read_manifest(path: &Path) -> Result<Vec<RepoSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let mut specs: Vec<RepoSpec> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

    if let Some(name) = first_duplicate_name(&specs) {
        anyhow::bail!(
            "repository {:?} is listed more than once in {}",
            name,
            path.display()
        );
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for spec in &mut specs {
        if spec.path.is_relative() {
            spec.path = base.join(&spec.path);
        }
    }
    Ok(specs)
}

fn first_duplicate_name(specs: &[RepoSpec]) -> Option<&str> {
    let mut names = HashSet::new();
    specs
        .iter()
        .map(|spec| spec.name.as_str())
        .find(|name| !names.insert(*name))
}

/// Outcome of mapping and exporting one repository
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryReport {
    pub repository_name: String,
    pub stats: MappingStats,
    pub signatures: usize,
    /// Written artifact; `None` when nothing was mapped or the run was skipped
    pub artifact: Option<PathBuf>,
    /// Why the repository produced no mapping, if it was skipped
    pub skipped: Option<String>,
}

impl RepositoryReport {
    fn skipped(repository_name: &str, reason: String) -> Self {
        RepositoryReport {
            repository_name: repository_name.to_string(),
            stats: MappingStats::default(),
            signatures: 0,
            artifact: None,
            skipped: Some(reason),
        }
    }
}

/// Map a repository and write its signature artifact
///
/// The artifact is written once, after every class pair has been processed,
/// and only when at least one focal method was mapped. A discovery failure is
/// reported in the returned report rather than as an error.
pub fn map_and_export(
    spec: &RepoSpec,
    output_dir: &Path,
    config_path: Option<&Path>,
) -> Result<RepositoryReport> {
    let config = config::load_and_resolve(&spec.path, config_path)
        .with_context(|| format!("failed to load configuration for {}", spec.name))?;
    let parser = create_parser(config.language, &config.test_annotations)?;
    tracing::debug!(
        repository = %spec.name,
        language = config.language.name(),
        "selected grammar"
    );

    let mapping = match map_repository(&spec.path, &config, parser.as_ref()) {
        Ok(mapping) => mapping,
        Err(e) => {
            tracing::warn!(repository = %spec.name, error = %e, "skipping repository");
            return Ok(RepositoryReport::skipped(&spec.name, e.to_string()));
        }
    };

    let set = mapping.signature_set(&spec.name);
    let artifact = if set.is_empty() {
        None
    } else {
        Some(set.write(output_dir)?)
    };
    tracing::info!(
        repository = %spec.name,
        signatures = set.len(),
        written = artifact.is_some(),
        "exported signature set"
    );

    Ok(RepositoryReport {
        repository_name: spec.name.clone(),
        stats: mapping.stats,
        signatures: set.len(),
        artifact,
        skipped: None,
    })
}

/// Run `job` inside a worker pool of `workers` threads (default: one per CPU)
///
/// Parallel iterators started by `job` are bounded by the pool.
pub fn with_worker_pool<T, F>(workers: Option<usize>, job: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = workers {
        builder = builder.num_threads(n.max(1));
    }
    let pool = builder.build().context("failed to build worker pool")?;
    Ok(pool.install(job))
}

/// Map every repository of a batch inside a bounded worker pool
///
/// Never aborts: a repository that fails for any reason is reported as
/// skipped and the batch moves on. Reports come back in manifest order.
pub fn map_repositories(
    specs: &[RepoSpec],
    output_dir: &Path,
    config_path: Option<&Path>,
    workers: Option<usize>,
) -> Result<Vec<RepositoryReport>> {
    with_worker_pool(workers, || {
        specs
            .par_iter()
            .map(|spec| {
                map_and_export(spec, output_dir, config_path).unwrap_or_else(|e| {
                    let reason = format!("{:#}", e);
                    tracing::warn!(repository = %spec.name, error = %reason, "repository failed");
                    RepositoryReport::skipped(&spec.name, reason)
                })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn java_parser() -> Box<dyn LanguageParser> {
        create_parser(Language::Java, &["Test".to_string()]).unwrap()
    }

    const CALCULATOR: &str = r#"
public class Calculator {
    public int add(int a, int b) { return a + b; }
    public int sum() { return 0; }
}
"#;

    const CALCULATOR_TEST: &str = r#"
public class CalculatorTest {
    @Test
    public void testAdd() { new Calculator().add(1, 2); }

    @Test
    public void testAddAgain() { new Calculator().add(2, 2); }

    @Test
    public void checkSum() { new Calculator().sum(); }
}
"#;

    #[test]
    fn test_map_repository_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main/java/Calculator.java", CALCULATOR);
        write(dir.path(), "src/test/java/CalculatorTest.java", CALCULATOR_TEST);

        let config = ResolvedConfig::defaults().unwrap();
        let parser = java_parser();
        let mapping = map_repository(dir.path(), &config, parser.as_ref()).unwrap();

        assert_eq!(mapping.stats.source_files, 2);
        assert_eq!(mapping.stats.test_classes, 1);
        assert_eq!(mapping.stats.mapped_test_classes, 1);
        assert_eq!(mapping.stats.test_cases, 3);
        assert_eq!(mapping.stats.mapped_test_cases, 3);
        assert_eq!(mapping.stats.mapped_by_name, 1);
        assert_eq!(mapping.stats.mapped_by_invocation, 2);

        let set = mapping.signature_set("calc");
        assert_eq!(set.signatures, vec!["int add(int a, int b)", "int sum()"]);
    }

    #[test]
    fn test_file_role_selects_methods() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/Mixed.java",
            r#"
class Mixed {
    @Test
    void testRun() { run(); }

    void run() {}
}
"#,
        );
        let parser = java_parser();

        let as_test = role_methods(dir.path(), "src/Mixed.java", true, parser.as_ref()).unwrap();
        let as_focal = role_methods(dir.path(), "src/Mixed.java", false, parser.as_ref()).unwrap();
        assert_eq!(as_test.len(), 1);
        assert_eq!(as_test[0].identifier, "testRun");
        assert_eq!(as_focal.len(), 1);
        assert_eq!(as_focal[0].identifier, "run");

        assert!(role_methods(dir.path(), "src/Gone.java", true, parser.as_ref()).is_none());
    }

    #[test]
    fn test_unparseable_focal_file_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/test/java/CalculatorTest.java", CALCULATOR_TEST);
        fs::create_dir_all(dir.path().join("src/main/java")).unwrap();
        fs::write(dir.path().join("src/main/java/Calculator.java"), [0xff, 0xfe, 0x00]).unwrap();

        let config = ResolvedConfig::defaults().unwrap();
        let parser = java_parser();
        let mapping = map_repository(dir.path(), &config, parser.as_ref()).unwrap();
        assert_eq!(mapping.stats.parse_failures, 1);
        assert!(mapping.pairs.is_empty());
    }

    #[test]
    fn test_map_and_export_skips_repository_without_tests() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "repo/src/main/java/Calculator.java", CALCULATOR);
        let out = dir.path().join("out");

        let spec = RepoSpec {
            name: "repo".to_string(),
            path: dir.path().join("repo"),
        };
        let report = map_and_export(&spec, &out, None).unwrap();
        assert!(report.skipped.is_some());
        assert!(report.artifact.is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_read_manifest_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("repos.json");
        fs::write(
            &manifest,
            r#"[{"name": "calc", "path": "calc"}, {"name": "abs", "path": "/srv/abs"}]"#,
        )
        .unwrap();

        let specs = read_manifest(&manifest).unwrap();
        assert_eq!(specs[0].path, dir.path().join("calc"));
        assert_eq!(specs[1].path, PathBuf::from("/srv/abs"));
    }

    #[test]
    fn test_read_manifest_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("repos.json");
        fs::write(
            &manifest,
            r#"[{"name": "calc", "path": "a"}, {"name": "calc", "path": "b"}]"#,
        )
        .unwrap();

        let err = read_manifest(&manifest).unwrap_err();
        assert!(err.to_string().contains("\"calc\""));
    }

    #[test]
    fn test_map_repositories_never_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "calc/src/main/java/Calculator.java", CALCULATOR);
        write(dir.path(), "calc/src/test/java/CalculatorTest.java", CALCULATOR_TEST);
        let out = dir.path().join("out");

        let specs = vec![
            RepoSpec {
                name: "missing".to_string(),
                path: dir.path().join("missing"),
            },
            RepoSpec {
                name: "calc".to_string(),
                path: dir.path().join("calc"),
            },
        ];
        let reports = map_repositories(&specs, &out, None, Some(2)).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].repository_name, "missing");
        assert!(reports[0].skipped.is_some());
        assert_eq!(reports[1].signatures, 2);
        assert!(out.join("calc").join("calc_signature.json").exists());
    }
}
