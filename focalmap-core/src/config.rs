//! Configuration file support for focalmap
//!
//! Loads repository-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.focalmaprc.json` in the repository root
//! 3. `focalmap.config.json` in the repository root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::language::Language;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_LANGUAGE: Language = Language::Java;
const DEFAULT_TEST_MARKER: &str = "@Test";
const DEFAULT_TEST_ANNOTATIONS: &[&str] = &["Test"];
const DEFAULT_TEST_SOURCE_DIR: &str = "src/test";
const DEFAULT_MAIN_SOURCE_DIR: &str = "src/main";

/// focalmap configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FocalmapConfig {
    /// Source file extensions without the dot (default: `["java"]`)
    ///
    /// Every extension must belong to the same supported grammar.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Text that flags a file as a test file when any line contains it (default: `@Test`)
    #[serde(default)]
    pub test_marker: Option<String>,

    /// Annotation simple names marking a method as a test case (default: `["Test"]`)
    #[serde(default)]
    pub test_annotations: Vec<String>,

    /// Conventional test source directory segment (default: `src/test`)
    #[serde(default)]
    pub test_source_dir: Option<String>,

    /// Conventional main source directory segment (default: `src/main`)
    #[serde(default)]
    pub main_source_dir: Option<String>,

    /// Glob patterns for repository-relative paths to ignore
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Worker pool size (default: number of CPUs)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Resolved configuration with defaults applied and globs compiled
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Grammar selected by the extensions
    pub language: Language,
    pub extensions: Vec<String>,
    pub test_marker: String,
    pub test_annotations: Vec<String>,
    pub test_source_dir: String,
    pub main_source_dir: String,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// Raw exclude patterns, kept for display
    pub exclude_patterns: Vec<String>,
    pub workers: Option<usize>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl FocalmapConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        for ext in &self.extensions {
            if ext.is_empty() {
                anyhow::bail!("extensions must not contain empty strings");
            }
            if ext.starts_with('.') {
                anyhow::bail!("extensions are written without the dot (got {:?})", ext);
            }
        }
        self.language()?;

        if let Some(ref marker) = self.test_marker {
            if marker.trim().is_empty() {
                anyhow::bail!("test_marker must not be blank");
            }
        }

        for name in &self.test_annotations {
            if name.is_empty() || name.starts_with('@') || name.contains('.') {
                anyhow::bail!(
                    "test_annotations entries are simple names like \"Test\" (got {:?})",
                    name
                );
            }
        }

        let test_dir = self
            .test_source_dir
            .as_deref()
            .unwrap_or(DEFAULT_TEST_SOURCE_DIR);
        let main_dir = self
            .main_source_dir
            .as_deref()
            .unwrap_or(DEFAULT_MAIN_SOURCE_DIR);
        for (field, dir) in [("test_source_dir", test_dir), ("main_source_dir", main_dir)] {
            if dir.is_empty() || dir.starts_with('/') || dir.ends_with('/') {
                anyhow::bail!(
                    "{} must be a relative segment without leading or trailing '/' (got {:?})",
                    field,
                    dir
                );
            }
        }
        if test_dir == main_dir {
            anyhow::bail!(
                "test_source_dir and main_source_dir must differ (both are {:?})",
                test_dir
            );
        }

        if self.workers == Some(0) {
            anyhow::bail!("workers must be at least 1");
        }

        // Validate glob patterns compile
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Grammar for the configured extensions
    pub fn language(&self) -> Result<Language> {
        let mut selected: Option<Language> = None;
        for ext in &self.extensions {
            let language = Language::from_extension(ext).with_context(|| {
                format!("no grammar available for extension {:?}", ext)
            })?;
            match selected {
                Some(previous) if previous != language => anyhow::bail!(
                    "extensions mix {} and {} sources",
                    previous.name(),
                    language.name()
                ),
                _ => selected = Some(language),
            }
        }
        Ok(selected.unwrap_or(DEFAULT_LANGUAGE))
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let exclude = {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.exclude {
                builder.add(Glob::new(pattern)?);
            }
            builder.build()?
        };

        let language = self.language()?;
        Ok(ResolvedConfig {
            language,
            extensions: or_defaults(&self.extensions, language.extensions()),
            test_marker: self
                .test_marker
                .clone()
                .unwrap_or_else(|| DEFAULT_TEST_MARKER.to_string()),
            test_annotations: or_defaults(&self.test_annotations, DEFAULT_TEST_ANNOTATIONS),
            test_source_dir: self
                .test_source_dir
                .clone()
                .unwrap_or_else(|| DEFAULT_TEST_SOURCE_DIR.to_string()),
            main_source_dir: self
                .main_source_dir
                .clone()
                .unwrap_or_else(|| DEFAULT_MAIN_SOURCE_DIR.to_string()),
            exclude,
            exclude_patterns: self.exclude.clone(),
            workers: self.workers,
            config_path: None,
        })
    }
}

fn or_defaults(values: &[String], defaults: &[&str]) -> Vec<String> {
    if values.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        values.to_vec()
    }
}

impl ResolvedConfig {
    /// Whether a repository-relative path is a source file worth reading
    pub fn should_include(&self, relative_path: &str) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        self.has_source_extension(relative_path)
    }

    /// Whether the path ends in one of the configured extensions
    pub fn has_source_extension(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        FocalmapConfig::default().resolve()
    }
}

/// Discover and load a config file from the repository root
///
/// Search order:
/// 1. `.focalmaprc.json`
/// 2. `focalmap.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(FocalmapConfig, PathBuf)>> {
    for name in [".focalmaprc.json", "focalmap.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<FocalmapConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: FocalmapConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a repository
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the repository root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (FocalmapConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
