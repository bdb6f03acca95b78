//! focalmap CLI - map Java test methods to the focal methods they exercise

#![deny(warnings)]

// Global invariants enforced:
// - Results go to stdout, logs go to stderr
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use focalmap_core::config::{self, ResolvedConfig};
use focalmap_core::language::create_parser;
use focalmap_core::pipeline::{self, RepoSpec, RepositoryReport};
use focalmap_core::{classify, ChangedFiles, Classification, RepositorySignatureSet, TestState};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "focalmap")]
#[command(about = "Static test-to-focal-method mapping for Java repositories")]
#[command(version = env!("FOCALMAP_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map one repository and write its signature artifact
    Map {
        /// Path to the repository root
        path: PathBuf,

        /// Repository name (default: directory name)
        #[arg(long)]
        name: Option<String>,

        /// Directory receiving `<name>/<name>_signature.json`
        #[arg(long, default_value = "focalmap-out")]
        output: PathBuf,

        /// Path to config file (default: auto-discover in the repository root)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worker threads (overrides config file)
        #[arg(long)]
        jobs: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Map every repository listed in a JSON manifest
    Batch {
        /// JSON list of `{ "name": ..., "path": ... }` entries
        #[arg(long)]
        manifest: PathBuf,

        /// Directory receiving one artifact per mapped repository
        #[arg(long)]
        output: PathBuf,

        /// Config file applied to every repository (default: per-repository discovery)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worker threads (default: one per CPU)
        #[arg(long)]
        jobs: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Classify changed files by test evidence
    Classify {
        /// Path to the repository root the diff applies to
        path: PathBuf,

        /// Unified diff file
        #[arg(long)]
        diff: PathBuf,

        /// Signature artifact written by `map` or `batch`
        #[arg(long)]
        signatures: PathBuf,

        /// Repository name (default: directory name)
        #[arg(long)]
        name: Option<String>,

        /// Path to config file (default: auto-discover in the repository root)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without mapping anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Map {
            path,
            name,
            output,
            config: config_path,
            jobs,
            format,
        } => {
            let repo_root = existing_dir(&path)?;
            let resolved = config::load_and_resolve(&repo_root, config_path.as_deref())
                .context("failed to load configuration")?;
            let spec = RepoSpec {
                name: name.unwrap_or_else(|| directory_name(&repo_root)),
                path: repo_root,
            };

            let report = pipeline::with_worker_pool(jobs.or(resolved.workers), || {
                pipeline::map_and_export(&spec, &output, config_path.as_deref())
            })??;

            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_report_text(&report),
            }
        }
        Commands::Batch {
            manifest,
            output,
            config: config_path,
            jobs,
            format,
        } => {
            let specs = pipeline::read_manifest(&manifest)?;
            tracing::info!(repositories = specs.len(), manifest = %manifest.display(), "starting batch");
            let reports =
                pipeline::map_repositories(&specs, &output, config_path.as_deref(), jobs)?;

            match format {
                OutputFormat::Json => print_json(&reports)?,
                OutputFormat::Text => print_batch_text(&reports),
            }
        }
        Commands::Classify {
            path,
            diff,
            signatures,
            name,
            config: config_path,
            format,
        } => {
            let repo_root = existing_dir(&path)?;
            let resolved = config::load_and_resolve(&repo_root, config_path.as_deref())
                .context("failed to load configuration")?;
            let name = name.unwrap_or_else(|| directory_name(&repo_root));

            let extension = resolved
                .extensions
                .first()
                .map(String::as_str)
                .unwrap_or("java");
            let changed = ChangedFiles::read(&diff, extension)?;
            let signature_set = RepositorySignatureSet::load(&signatures, &name)?;
            let parser = create_parser(resolved.language, &resolved.test_annotations)?;

            let result = classify(&repo_root, &changed, &signature_set, parser.as_ref());
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => print_classification_text(&result),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config_text(&resolved);
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Absolute path of an existing directory
fn existing_dir(path: &Path) -> anyhow::Result<PathBuf> {
    let normalized = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };
    if !normalized.is_dir() {
        anyhow::bail!("Path is not a directory: {}", normalized.display());
    }
    Ok(normalized)
}

fn directory_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn print_report_text(report: &RepositoryReport) {
    println!("Repository: {}", report.repository_name);
    if let Some(ref reason) = report.skipped {
        println!("  Skipped: {}", reason);
        return;
    }
    let s = &report.stats;
    println!("  Source files:          {}", s.source_files);
    println!("  Test classes:          {}", s.test_classes);
    println!("  Focal candidates:      {}", s.focal_candidates);
    println!("  Mapped test classes:   {}", s.mapped_test_classes);
    println!("  Test cases:            {}", s.test_cases);
    println!(
        "  Mapped test cases:     {} (name: {}, invocation: {})",
        s.mapped_test_cases, s.mapped_by_name, s.mapped_by_invocation
    );
    println!("  Ambiguous test cases:  {}", s.ambiguous_test_cases);
    println!("  Parse failures:        {}", s.parse_failures);
    println!("  Signatures:            {}", report.signatures);
    match report.artifact {
        Some(ref path) => println!("  Artifact:              {}", path.display()),
        None => println!("  Artifact:              none (nothing mapped)"),
    }
}

fn print_batch_text(reports: &[RepositoryReport]) {
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>10}",
        "repository", "tclasses", "tcases", "mapped", "signatures"
    );
    for report in reports {
        match report.skipped {
            Some(ref reason) => println!("{:<30} skipped: {}", report.repository_name, reason),
            None => println!(
                "{:<30} {:>8} {:>8} {:>8} {:>10}",
                report.repository_name,
                report.stats.mapped_test_classes,
                report.stats.test_cases,
                report.stats.mapped_test_cases,
                report.signatures
            ),
        }
    }
    let skipped = reports.iter().filter(|r| r.skipped.is_some()).count();
    println!();
    println!(
        "{} repositories, {} mapped, {} skipped",
        reports.len(),
        reports.len() - skipped,
        skipped
    );
}

fn print_classification_text(result: &Classification) {
    for (name, state) in &result.states {
        let meaning = match state {
            TestState::NoEvidence => "no test evidence",
            TestState::SiblingTestChanged => "sibling test changed",
            TestState::MappedTestExists => "mapped test exists",
        };
        println!("{:<40} {}  {}", name, state.code(), meaning);
    }
    for name in &result.skipped_tests {
        println!("{:<40} -  test file", name);
    }
}

fn print_config_text(resolved: &ResolvedConfig) {
    println!("Configuration:");
    match resolved.config_path {
        Some(ref p) => println!("  Source: {}", p.display()),
        None => println!("  Source: defaults (no config file found)"),
    }
    println!();
    println!("Discovery:");
    println!("  language: {}", resolved.language.name());
    println!("  extensions: {}", resolved.extensions.join(", "));
    println!("  test_marker: {}", resolved.test_marker);
    println!(
        "  exclude: {}",
        if resolved.exclude_patterns.is_empty() {
            "none".to_string()
        } else {
            resolved.exclude_patterns.join(", ")
        }
    );
    println!();
    println!("Matching:");
    println!("  test_annotations: {}", resolved.test_annotations.join(", "));
    println!("  test_source_dir: {}", resolved.test_source_dir);
    println!("  main_source_dir: {}", resolved.main_source_dir);
    println!();
    println!(
        "Workers: {}",
        resolved
            .workers
            .map(|v| v.to_string())
            .unwrap_or_else(|| "one per CPU".to_string())
    );
}
