//! Java structural parser using tree-sitter

use crate::error::ParseError;
use crate::language::parser::{LanguageParser, ParsedModule};
use crate::language::tree_sitter_utils::{
    collect_descendants, field_text, find_child_by_kind, node_text,
};
use crate::model::{ClassRecord, MethodRecord, Parameter};
use crate::signature::{render_parameters, render_signature, CaptureEvent, SignatureBuilder};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

/// Node kinds that declare a type with its own member list
const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Node kinds never searched for nested type declarations
///
/// Local and anonymous classes inside these are not modelled.
const OPAQUE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "field_declaration",
    "static_initializer",
    "block",
];

/// Header clauses kept as the class argument list
const ARGUMENT_LIST_FIELDS: &[&str] = &["type_parameters", "superclass", "interfaces"];

const METHOD_SIGNATURE_QUERY: &str = r#"
(method_declaration
  type: (_) @return_type
  name: (identifier) @method_name
  parameters: (formal_parameters) @param_list)
"#;

/// Java parser using tree-sitter
pub struct JavaParser {
    language: tree_sitter::Language,
    test_annotations: Vec<String>,
}

impl JavaParser {
    /// Create a new Java parser
    ///
    /// `test_annotations` holds annotation simple names (e.g. `Test`) that mark
    /// a method as a test case.
    pub fn new(test_annotations: Vec<String>) -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        // Just validate that we can create a parser
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .context("Failed to set Java language for parser")?;
        Ok(JavaParser {
            language,
            test_annotations,
        })
    }
}

impl LanguageParser for JavaParser {
    fn parse(&self, source: &str, filename: &str) -> Result<Box<dyn ParsedModule>, ParseError> {
        // tree-sitter parsers are not Sync, so each parse gets its own
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::Grammar {
                path: filename.into(),
                reason: e.to_string(),
            })?;

        let tree = parser.parse(source, None).ok_or_else(|| ParseError::Grammar {
            path: filename.into(),
            reason: "parser produced no syntax tree".to_string(),
        })?;

        if tree.root_node().has_error() {
            tracing::debug!(file = filename, "syntax errors recovered while parsing");
        }

        Ok(Box::new(JavaModule {
            tree,
            source: source.to_string(),
            file: filename.to_string(),
            language: self.language.clone(),
            test_annotations: self.test_annotations.clone(),
        }))
    }
}

/// Parsed Java module
struct JavaModule {
    tree: Tree,
    source: String,
    file: String,
    language: tree_sitter::Language,
    test_annotations: Vec<String>,
}

impl ParsedModule for JavaModule {
    fn classes(&self) -> Vec<ClassRecord> {
        let mut classes = Vec::new();
        discover_types(self.tree.root_node(), self, &mut classes);
        classes
    }

    fn method_signatures(&self) -> Vec<String> {
        let query = match Query::new(&self.language, METHOD_SIGNATURE_QUERY) {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(file = %self.file, error = %e, "method signature query rejected");
                return Vec::new();
            }
        };
        let capture_names = query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&query, self.tree.root_node(), self.source.as_bytes());

        let mut builder = SignatureBuilder::new();
        while let Some((query_match, capture_index)) = captures.next() {
            let capture = query_match.captures[*capture_index];
            let text = node_text(capture.node, &self.source).to_string();
            let event = match capture_names[capture.index as usize] {
                "return_type" => CaptureEvent::ReturnType(text),
                "method_name" => CaptureEvent::Name(text),
                "param_list" => {
                    CaptureEvent::Parameters(extract_parameters(capture.node, &self.source))
                }
                _ => continue,
            };
            builder.feed(event);
        }
        builder.finish()
    }
}

/// Recursively find type declarations, outer types first
fn discover_types(node: Node, module: &JavaModule, classes: &mut Vec<ClassRecord>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let kind = child.kind();
        if TYPE_DECLARATION_KINDS.contains(&kind) {
            if let Some(class) = extract_class(child, module) {
                classes.push(class);
            }
            if let Some(body) = child.child_by_field_name("body") {
                discover_types(body, module, classes);
            }
        } else if !OPAQUE_KINDS.contains(&kind) {
            discover_types(child, module, classes);
        }
    }
}

/// Build a ClassRecord from a type declaration node
fn extract_class(node: Node, module: &JavaModule) -> Option<ClassRecord> {
    let source = module.source.as_str();
    let identifier = field_text(node, "name", source)?.to_string();

    let mut clauses: Vec<&str> = ARGUMENT_LIST_FIELDS
        .iter()
        .filter_map(|field| field_text(node, field, source))
        .collect();
    // Interfaces list their parents in an unnamed `extends_interfaces` child
    if let Some(extends) = find_child_by_kind(node, "extends_interfaces") {
        clauses.push(node_text(extends, source));
    }

    let methods = node
        .child_by_field_name("body")
        .map(|body| {
            class_members(body)
                .into_iter()
                .filter_map(|member| extract_method(member, &identifier, module))
                .collect()
        })
        .unwrap_or_default();

    Some(ClassRecord {
        identifier,
        file: module.file.clone(),
        methods,
        argument_list: clauses.join(" "),
    })
}

/// Direct members of a class, interface, enum or record body
fn class_members(body: Node) -> Vec<Node> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.named_children(&mut inner));
        } else {
            members.push(child);
        }
    }
    members
}

/// Build a MethodRecord from a method or constructor declaration
fn extract_method(node: Node, class_name: &str, module: &JavaModule) -> Option<MethodRecord> {
    let is_constructor = match node.kind() {
        "method_declaration" => false,
        "constructor_declaration" => true,
        _ => return None,
    };
    let source = module.source.as_str();

    let identifier = field_text(node, "name", source)?.to_string();
    let return_type = if is_constructor {
        None
    } else {
        field_text(node, "type", source)
    };
    let parameters = node
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, source))
        .unwrap_or_default();

    let body_node = node.child_by_field_name("body");
    let body = body_node
        .map(|b| node_text(b, source).to_string())
        .unwrap_or_default();
    let invocations = body_node
        .map(|b| extract_invocations(b, source))
        .unwrap_or_default();

    if is_constructor && identifier != class_name {
        tracing::debug!(
            file = %module.file,
            constructor = %identifier,
            class = class_name,
            "constructor name differs from enclosing class"
        );
    }

    Some(MethodRecord {
        signature: render_signature(return_type, &identifier, &render_parameters(&parameters)),
        identifier,
        parameters,
        body,
        invocations,
        is_testcase: has_test_annotation(node, source, &module.test_annotations),
        is_constructor,
    })
}

/// Whether the method's own modifiers carry one of the test annotations
fn has_test_annotation(node: Node, source: &str, test_annotations: &[String]) -> bool {
    let Some(modifiers) = find_child_by_kind(node, "modifiers") else {
        return false;
    };

    let mut inner = modifiers.walk();
    let found = modifiers.named_children(&mut inner).any(|modifier| {
        matches!(modifier.kind(), "annotation" | "marker_annotation")
            && field_text(modifier, "name", source)
                .map(|name| name.rsplit('.').next().unwrap_or(name))
                .is_some_and(|simple| test_annotations.iter().any(|a| a == simple))
    });
    found
}

/// `(type, name)` pairs of a `formal_parameters` node
///
/// Modifiers, annotations and comments are dropped. C-style array dimensions
/// move onto the type (`int a[]` is `int[] a`), varargs render their type with
/// a trailing `...` and receiver parameters are skipped.
fn extract_parameters(node: Node, source: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut cursor = node.walk();
    for param in node.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                if let (Some(type_name), Some(name)) = (
                    field_text(param, "type", source),
                    field_text(param, "name", source),
                ) {
                    let dimensions = find_child_by_kind(param, "dimensions")
                        .map(|d| node_text(d, source))
                        .unwrap_or("");
                    parameters.push(Parameter {
                        type_name: format!("{}{}", type_name, dimensions),
                        name: name.to_string(),
                    });
                }
            }
            "spread_parameter" => {
                if let Some(p) = extract_spread_parameter(param, source) {
                    parameters.push(p);
                }
            }
            _ => {}
        }
    }
    parameters
}

fn extract_spread_parameter(node: Node, source: &str) -> Option<Parameter> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    let type_node = children
        .iter()
        .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))?;
    let declarator = children.iter().find(|c| c.kind() == "variable_declarator")?;
    let name = field_text(*declarator, "name", source)?;
    Some(Parameter {
        type_name: format!("{}...", node_text(*type_node, source)),
        name: name.to_string(),
    })
}

/// Distinct names of methods invoked anywhere in `body`
fn extract_invocations(body: Node, source: &str) -> BTreeSet<String> {
    let mut calls = Vec::new();
    collect_descendants(body, "method_invocation", &mut calls);
    calls
        .into_iter()
        .filter_map(|call| field_text(call, "name", source))
        .map(str::to_string)
        .collect()
}
