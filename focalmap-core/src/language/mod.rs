//! Language detection and abstraction layer
//!
//! This module provides the grammar-facing interfaces used by the structural
//! parser. Java is the only grammar shipped today.

pub mod java;
pub mod parser;
pub mod tree_sitter_utils;

pub use java::JavaParser;
pub use parser::{LanguageParser, ParsedModule};

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Java (.java)
    Java,
}

impl Language {
    /// Detect language from file extension
    ///
    /// Returns `None` if the extension is not recognized.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    /// Get the canonical name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "Java",
        }
    }

    /// Get file extensions for this language (without the dot)
    pub fn extensions(&self) -> &[&'static str] {
        match self {
            Language::Java => &["java"],
        }
    }
}

/// Instantiate the parser for `language`
///
/// `test_annotations` are the annotation simple names that mark a test case.
pub fn create_parser(
    language: Language,
    test_annotations: &[String],
) -> anyhow::Result<Box<dyn LanguageParser>> {
    use anyhow::Context;

    let parser: Box<dyn LanguageParser> = match language {
        Language::Java => Box::new(
            JavaParser::new(test_annotations.to_vec()).context("Failed to create Java parser")?,
        ),
    };
    Ok(parser)
}
