//! Error types for the mapping engine.
//!
//! Only two failures are real errors: a file that cannot be parsed and a
//! repository whose test-file discovery fails. Failing to find a focal class or
//! a focal method is a normal outcome and is reported through counters instead.

use std::path::PathBuf;

/// A source file could not be turned into class records.
///
/// Callers treat the file as contributing zero classes.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    Decode { path: PathBuf },

    #[error("grammar rejected {path}: {reason}")]
    Grammar { path: PathBuf, reason: String },
}

impl ParseError {
    /// Classify an I/O failure while reading `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::InvalidData {
            ParseError::Decode { path }
        } else {
            ParseError::Read { path, source }
        }
    }
}

/// Test-file discovery failed for a whole repository.
///
/// The repository yields an empty signature set; a batch run moves on.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("repository root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no file under {0} contains the test marker")]
    NoTestFiles(PathBuf),
}
