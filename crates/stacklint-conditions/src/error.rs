//! # Condition Errors
//!
//! The two recoverable logic signals of the condition engine and the
//! build-time issues found in a template's `Conditions` section.
//!
//! - [`ConditionError::Unsatisfiable`]: a contradiction while assuming
//!   condition values. Callers abandon the branch; never fatal.
//! - [`ConditionError::UnknownSatisfaction`]: the condition is undefined,
//!   malformed or cyclic, so nothing can be said about it. Never treated as
//!   always-true.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stacklint_core::PathSegment;

/// Errors raised while reasoning about conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// The requested assignment contradicts the current one.
    #[error("unsatisfiable condition assignment: {description}")]
    Unsatisfiable {
        /// The assignment that was requested.
        new: BTreeMap<String, bool>,
        /// The assignment already in force.
        current: BTreeMap<String, bool>,
        /// Which condition(s) conflict.
        description: String,
    },

    /// The condition cannot be reasoned about.
    #[error("unknown satisfaction for condition {name:?}: {reason}")]
    UnknownSatisfaction {
        /// Condition name.
        name: String,
        /// Why it is unknown.
        reason: String,
    },

    /// Scenario enumeration would exceed the configured leaf limit.
    #[error("{leaves} independent predicates exceed the scenario limit of {limit}")]
    TooComplex {
        /// Free leaves involved.
        leaves: usize,
        /// Configured maximum.
        limit: usize,
    },
}

/// Why a condition definition was rejected while building a condition set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// A `Condition` reference names a condition that does not exist.
    Undefined {
        /// The missing condition name.
        reference: String,
    },
    /// The condition refers back to itself through `Condition` references.
    Cyclic {
        /// The reference chain that closes the cycle.
        chain: Vec<String>,
    },
    /// The condition is not a well-formed boolean expression.
    Malformed {
        /// What is wrong.
        reason: String,
    },
}

/// A rejected condition definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionIssue {
    /// The condition whose definition was rejected.
    pub name: String,
    /// Document path of the offending node.
    pub path: Vec<PathSegment>,
    /// What went wrong.
    pub kind: IssueKind,
}

impl ConditionIssue {
    /// Human-readable message.
    pub fn message(&self) -> String {
        match &self.kind {
            IssueKind::Undefined { reference } => format!(
                "Condition {:?} references undefined condition {reference:?}",
                self.name
            ),
            IssueKind::Cyclic { chain } => format!(
                "Condition {:?} is cyclic: {}",
                self.name,
                chain.join(" -> ")
            ),
            IssueKind::Malformed { reason } => {
                format!("Condition {:?} is malformed: {reason}", self.name)
            }
        }
    }
}
