//! # stacklint-conditions — Condition Engine
//!
//! Models a template's `Conditions` section as boolean constraints over
//! canonical `Fn::Equals` predicates and answers the questions validation
//! needs:
//!
//! - Can condition `C` be true (or false) given what is already assumed?
//! - Are two conditions the same predicate under different names?
//! - Does one scenario imply a condition?
//! - Which combinations of a set of conditions are actually reachable?
//!
//! ## Design
//!
//! [`ConditionSet`] is built once per template and shared (`Arc`) by every
//! region pass. [`ConditionState`] is the per-walk view: an immutable value
//! that grows by [`ConditionState::evolve`] and memoizes consistency answers
//! in a pass-scoped [`SatCache`].
//!
//! Rejected definitions (undefined references, cycles, malformed
//! expressions) are reported once as [`ConditionIssue`]s at build time and
//! surface later as [`ConditionError::UnknownSatisfaction`], never as
//! always-true.
//!
//! ## Crate Policy
//!
//! - Depends only on `stacklint-core`.
//! - No `unsafe` code.

pub mod equals;
pub mod error;
pub mod expr;
pub mod scenario;
pub mod set;
pub mod state;

pub use equals::{Equals, Operand, OperandKind};
pub use error::{ConditionError, ConditionIssue, IssueKind};
pub use expr::{CondExpr, Condition};
pub use scenario::{Scenario, ScenarioSpace, Scenarios};
pub use set::ConditionSet;
pub use state::{ConditionState, ConditionStatus, SatCache, StatusConflict};
