//! focalmap core library - static test-to-focal-method mapping for Java repositories

#![deny(warnings)]

// Global invariants enforced in this crate:
// - No process-wide state: every call takes its repository root explicitly
// - A test method maps to at most one focal method
// - Signature order is first-seen and independent of worker scheduling
// - The per-repository artifact is written once, after all class pairs finish

pub mod class_match;
pub mod classify;
pub mod config;
pub mod diff;
pub mod discover;
pub mod error;
pub mod export;
pub mod language;
pub mod method_match;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod signature;

pub use classify::{classify, Classification, TestState};
pub use config::ResolvedConfig;
pub use diff::ChangedFiles;
pub use error::{DiscoveryError, ParseError};
pub use export::RepositorySignatureSet;
pub use model::{ClassRecord, MappedPair, MethodRecord, Parameter, SourceFile};
pub use pipeline::{
    map_and_export, map_repositories, map_repository, MappingStats, RepoSpec, RepositoryMapping,
    RepositoryReport,
};
