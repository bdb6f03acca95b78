//! Test method to focal method matching
//!
//! Two heuristics run in strict order for every test method:
//! 1. Name: the test identifier with every `test` removed equals a focal
//!    identifier (case-insensitive). First equal focal method wins.
//! 2. Unique invocation: exactly one focal identifier appears among the
//!    test method's direct call targets (case-insensitive).
//!
//! Anything else produces no pair. There is no tie-break.

use crate::model::{MappedPair, MethodRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// Heuristic that produced a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Name,
    UniqueInvocation,
}

/// Result of matching one test method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodMatchOutcome {
    /// Index into the focal method list and the heuristic that chose it
    Mapped { focal_index: usize, strategy: MatchStrategy },
    /// No call target overlaps the focal class
    NoMatch,
    /// More than one focal identifier is invoked
    Ambiguous { candidates: usize },
}

/// Strip every case-insensitive `test` from an identifier
pub fn strip_test_token(identifier: &str) -> String {
    identifier.to_lowercase().replace("test", "")
}

/// Decide which focal method, if any, `test_case` exercises
pub fn match_method(test_case: &MethodRecord, focal_methods: &[MethodRecord]) -> MethodMatchOutcome {
    let stripped = strip_test_token(&test_case.identifier);
    if let Some(index) = focal_methods
        .iter()
        .position(|focal| focal.identifier.to_lowercase() == stripped)
    {
        return MethodMatchOutcome::Mapped {
            focal_index: index,
            strategy: MatchStrategy::Name,
        };
    }

    let focal_names: BTreeSet<String> = focal_methods
        .iter()
        .map(|focal| focal.identifier.to_lowercase())
        .collect();
    let invoked: BTreeSet<String> = test_case
        .invocations
        .iter()
        .map(|name| name.to_lowercase())
        .collect();
    let overlap: Vec<&String> = invoked.intersection(&focal_names).collect();

    match overlap.as_slice() {
        [] => MethodMatchOutcome::NoMatch,
        [only] => focal_methods
            .iter()
            .position(|focal| focal.identifier.to_lowercase() == **only)
            .map_or(MethodMatchOutcome::NoMatch, |index| {
                MethodMatchOutcome::Mapped {
                    focal_index: index,
                    strategy: MatchStrategy::UniqueInvocation,
                }
            }),
        many => MethodMatchOutcome::Ambiguous {
            candidates: many.len(),
        },
    }
}

/// Per class pair tallies of match outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodMatchCounts {
    pub test_cases: usize,
    pub by_name: usize,
    pub by_invocation: usize,
    pub ambiguous: usize,
}

impl MethodMatchCounts {
    pub fn mapped(&self) -> usize {
        self.by_name + self.by_invocation
    }
}

/// Pair every test method of one class pair with at most one focal method
///
/// `test_methods` must be test cases and `focal_methods` non-test methods
/// (constructors included). Returned pairs carry body-stripped focal copies.
pub fn match_methods(
    test_class: &str,
    test_methods: &[MethodRecord],
    focal_class: &str,
    focal_methods: &[MethodRecord],
) -> (Vec<MappedPair>, MethodMatchCounts) {
    let mut pairs = Vec::new();
    let mut counts = MethodMatchCounts::default();

    for test_case in test_methods {
        counts.test_cases += 1;
        let outcome = match_method(test_case, focal_methods);
        tracing::debug!(
            test_class,
            test_case = %test_case.identifier,
            outcome = ?outcome,
            "matched test case"
        );

        match outcome {
            MethodMatchOutcome::Mapped {
                focal_index,
                strategy,
            } => {
                match strategy {
                    MatchStrategy::Name => counts.by_name += 1,
                    MatchStrategy::UniqueInvocation => counts.by_invocation += 1,
                }
                pairs.push(MappedPair {
                    test_class: test_class.to_string(),
                    test_case: test_case.clone(),
                    focal_class: focal_class.to_string(),
                    focal_method: focal_methods[focal_index].stripped(),
                });
            }
            MethodMatchOutcome::Ambiguous { .. } => counts.ambiguous += 1,
            MethodMatchOutcome::NoMatch => {}
        }
    }

    (pairs, counts)
}
