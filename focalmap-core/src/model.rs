//! Structural records produced by the parser and consumed by the matchers
//!
//! Global invariants enforced:
//! - Records are built once per parse and never mutated afterwards
//! - `is_testcase` depends only on annotations attached to the method itself
//! - `invocations` holds direct call targets only, never a transitive closure

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One source file read from a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative path with `/` separators
    pub path: String,
    pub text: String,
    /// Inventory flag: the file carries the test marker
    pub is_test: bool,
}

impl SourceFile {
    /// Read `relative_path` under `root`
    pub fn read(root: &Path, relative_path: &str, is_test: bool) -> Result<Self, ParseError> {
        let absolute: PathBuf = root.join(relative_path);
        let text = std::fs::read_to_string(&absolute)
            .map_err(|e| ParseError::from_io(absolute.clone(), e))?;
        Ok(SourceFile {
            path: relative_path.to_string(),
            text,
            is_test,
        })
    }
}

/// A formal parameter as written in the declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

/// A method or constructor declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub identifier: String,
    /// Return type, name and parameter list, whitespace-normalized
    pub signature: String,
    pub parameters: Vec<Parameter>,
    /// Raw text of the body block; empty for abstract and interface methods
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub body: String,
    /// Names of methods invoked directly in the body
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub invocations: BTreeSet<String>,
    pub is_testcase: bool,
    pub is_constructor: bool,
}

impl MethodRecord {
    /// Shallow copy without the body text and invocation names
    pub fn stripped(&self) -> MethodRecord {
        MethodRecord {
            identifier: self.identifier.clone(),
            signature: self.signature.clone(),
            parameters: self.parameters.clone(),
            body: String::new(),
            invocations: BTreeSet::new(),
            is_testcase: self.is_testcase,
            is_constructor: self.is_constructor,
        }
    }
}

/// A type declaration (class, interface, enum or record) and its own methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub identifier: String,
    /// Repository-relative path of the declaring file
    pub file: String,
    pub methods: Vec<MethodRecord>,
    /// Raw text of the type parameters, superclass and interfaces clauses
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub argument_list: String,
}

impl ClassRecord {
    /// Methods carrying a test annotation
    pub fn test_cases(&self) -> impl Iterator<Item = &MethodRecord> {
        self.methods.iter().filter(|m| m.is_testcase)
    }

    /// Methods that may be exercised by a test (constructors included)
    pub fn focal_candidates(&self) -> impl Iterator<Item = &MethodRecord> {
        self.methods.iter().filter(|m| !m.is_testcase)
    }
}

/// A test method linked to the focal method it is believed to exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedPair {
    pub test_class: String,
    pub test_case: MethodRecord,
    pub focal_class: String,
    pub focal_method: MethodRecord,
}
