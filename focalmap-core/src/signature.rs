//! Method signature rendering and normalization
//!
//! A signature is the textual key used to decide whether a changed method is
//! covered by a mapped test. It is never type-resolved: two methods with the
//! same text but different imported types are indistinguishable.

use crate::model::Parameter;
use regex::Regex;
use std::sync::LazyLock;

static COMMA_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*").expect("valid regex"));

static NEWLINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*").expect("valid regex"));

/// Normalize signature whitespace
///
/// A comma and any whitespace after it collapse to `", "`, every other line
/// break (and the indentation after it) is removed. Applying it twice is a no-op.
pub fn normalize_signature(raw: &str) -> String {
    let without_cr = raw.replace('\r', "");
    let commas = COMMA_SPACE_RE.replace_all(&without_cr, ", ");
    NEWLINE_RE.replace_all(&commas, "").trim().to_string()
}

/// Render `return_type name(params)` from declaration text
///
/// `parameters_text` is the parenthesized list exactly as written. Constructors
/// pass no return type.
pub fn render_signature(return_type: Option<&str>, name: &str, parameters_text: &str) -> String {
    let raw = match return_type {
        Some(ret) if !ret.is_empty() => format!("{} {}{}", ret, name, parameters_text),
        _ => format!("{}{}", name, parameters_text),
    };
    normalize_signature(&raw)
}

/// Render a parameter list from `(type, name)` pairs
pub fn render_parameters(parameters: &[Parameter]) -> String {
    let joined = parameters
        .iter()
        .map(|p| format!("{} {}", p.type_name, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("({})", joined)
}

/// One capture reported while scanning method declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    ReturnType(String),
    Name(String),
    Parameters(Vec<Parameter>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BuilderState {
    AwaitingReturnType,
    AwaitingName { return_type: String },
    AwaitingParams { return_type: String, name: String },
}

/// Assembles signatures from a stream of capture events
///
/// Transitions: `AwaitingReturnType -> AwaitingName -> AwaitingParams -> emit`.
/// A return type always starts a new declaration; events that arrive out of
/// order are dropped rather than attached to the wrong method.
#[derive(Debug)]
pub struct SignatureBuilder {
    state: BuilderState,
    signatures: Vec<String>,
}

impl SignatureBuilder {
    pub fn new() -> Self {
        SignatureBuilder {
            state: BuilderState::AwaitingReturnType,
            signatures: Vec::new(),
        }
    }

    pub fn feed(&mut self, event: CaptureEvent) {
        let state = std::mem::replace(&mut self.state, BuilderState::AwaitingReturnType);
        self.state = match (state, event) {
            (_, CaptureEvent::ReturnType(return_type)) => BuilderState::AwaitingName { return_type },
            (BuilderState::AwaitingName { return_type }, CaptureEvent::Name(name)) => {
                BuilderState::AwaitingParams { return_type, name }
            }
            (BuilderState::AwaitingParams { return_type, name }, CaptureEvent::Parameters(params)) => {
                self.signatures.push(render_signature(
                    Some(&return_type),
                    &name,
                    &render_parameters(&params),
                ));
                BuilderState::AwaitingReturnType
            }
            (other, _) => other,
        };
    }

    /// Signatures in declaration order
    pub fn finish(self) -> Vec<String> {
        self.signatures
    }
}

impl Default for SignatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}
