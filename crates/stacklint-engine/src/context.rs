//! # Evaluation Context
//!
//! A [`Context`] is everything the validator knows about the position it is
//! checking: the regions of the pass, the three parallel document paths, the
//! condition values assumed on the way down, the template declarations and
//! the intrinsic functions legal here.
//!
//! ## Invariants
//!
//! - A context is never mutated. [`Context::evolve`] returns a new value;
//!   path fields append, condition assumptions merge, every other field is
//!   replaced only when the change names it.
//! - Shared data (template declarations, condition set, caches) sits behind
//!   `Arc` and is read-only. Per-context collections are owned, so siblings
//!   derived from one parent never observe each other.
//! - Condition assumptions are monotonic: a known value never flips. An
//!   attempt fails with `ConditionError::Unsatisfiable`.

use std::collections::BTreeMap;
use std::sync::Arc;

use stacklint_conditions::{ConditionError, ConditionSet, ConditionState, ConditionStatus};
use stacklint_core::{DocumentPath, PathSegment, Region, Template};

use crate::functions::{Function, FunctionSet};

/// One step appended to a context's paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// An ordinary key or index, extending all three paths.
    Push(PathSegment),
    /// A document key outside the resource schema.
    Document(PathSegment),
    /// An intrinsic-function wrapper key.
    Function(Function),
    /// A conditional branch whose value stands in for the enclosing value.
    Branch(usize),
}

/// The fields an [`evolve`](Context::evolve) call changes.
#[derive(Debug, Clone, Default)]
pub struct Changes {
    path: Vec<PathStep>,
    conditions: BTreeMap<String, bool>,
    functions: Option<FunctionSet>,
    resolved_value: Option<bool>,
    strict_types: Option<bool>,
    resolve_pseudo_parameters: Option<bool>,
    resource_type: Option<String>,
}

impl Changes {
    /// No changes.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.push(PathStep::Push(segment.into()));
        self
    }

    pub fn push_document(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.push(PathStep::Document(segment.into()));
        self
    }

    pub fn enter_function(mut self, function: Function) -> Self {
        self.path.push(PathStep::Function(function));
        self
    }

    pub fn enter_branch(mut self, index: usize) -> Self {
        self.path.push(PathStep::Branch(index));
        self
    }

    /// Assume `name` has `value`.
    pub fn condition(mut self, name: impl Into<String>, value: bool) -> Self {
        self.conditions.insert(name.into(), value);
        self
    }

    /// Assume every entry of `assumptions`.
    pub fn conditions(mut self, assumptions: &BTreeMap<String, bool>) -> Self {
        self.conditions
            .extend(assumptions.iter().map(|(k, v)| (k.clone(), *v)));
        self
    }

    pub fn functions(mut self, functions: FunctionSet) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn resolved_value(mut self, resolved: bool) -> Self {
        self.resolved_value = Some(resolved);
        self
    }

    pub fn strict_types(mut self, strict: bool) -> Self {
        self.strict_types = Some(strict);
        self
    }

    pub fn resolve_pseudo_parameters(mut self, resolve: bool) -> Self {
        self.resolve_pseudo_parameters = Some(resolve);
        self
    }

    pub fn resource_type(mut self, type_name: impl Into<String>) -> Self {
        self.resource_type = Some(type_name.into());
        self
    }
}

/// Immutable evaluation state at one position of a validation walk.
#[derive(Debug, Clone)]
pub struct Context {
    path: DocumentPath,
    conditions: ConditionState,
    template: Arc<Template>,
    functions: FunctionSet,
    resolved_value: bool,
    strict_types: bool,
    resolve_pseudo_parameters: bool,
    resource_type: Option<Arc<str>>,
}

impl Context {
    /// The root context of a pass.
    pub fn new(template: Arc<Template>, conditions: ConditionState) -> Self {
        Self {
            path: DocumentPath::root(),
            conditions,
            template,
            functions: FunctionSet::all(),
            resolved_value: false,
            strict_types: false,
            resolve_pseudo_parameters: true,
            resource_type: None,
        }
    }

    /// A root context for one region, building the condition set from the
    /// template. Condition build issues are discarded; use
    /// [`ConditionSet::from_template`] directly to report them.
    pub fn for_region(template: Arc<Template>, region: Region) -> Self {
        let (set, _) = ConditionSet::from_template(&template);
        let conditions = ConditionState::new(Arc::new(set), vec![region]);
        Self::new(template, conditions)
    }

    /// Derive a new context. The receiver is unchanged.
    ///
    /// # Errors
    ///
    /// Propagates `Unsatisfiable` and `UnknownSatisfaction` from the
    /// condition state when `changes` assumes condition values.
    pub fn evolve(&self, changes: Changes) -> Result<Self, ConditionError> {
        let conditions = if changes.conditions.is_empty() {
            self.conditions.clone()
        } else {
            self.conditions.evolve(&changes.conditions)?
        };
        let mut path = self.path.clone();
        for step in changes.path {
            path = match step {
                PathStep::Push(segment) => path.push(segment),
                PathStep::Document(segment) => path.push_document(segment),
                PathStep::Function(function) => path.enter_function(function.name()),
                PathStep::Branch(index) => path.enter_branch(index),
            };
        }
        Ok(Self {
            path,
            conditions,
            template: Arc::clone(&self.template),
            functions: changes.functions.unwrap_or(self.functions),
            resolved_value: changes.resolved_value.unwrap_or(self.resolved_value),
            strict_types: changes.strict_types.unwrap_or(self.strict_types),
            resolve_pseudo_parameters: changes
                .resolve_pseudo_parameters
                .unwrap_or(self.resolve_pseudo_parameters),
            resource_type: changes
                .resource_type
                .map(Arc::from)
                .or_else(|| self.resource_type.clone()),
        })
    }

    /// Descend one ordinary path segment. Never fails.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        Self {
            path: self.path.push(segment),
            ..self.clone()
        }
    }

    /// Regions validated simultaneously.
    pub fn regions(&self) -> &[Region] {
        self.conditions.regions()
    }

    /// Current position.
    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    /// Condition assumptions in force.
    pub fn conditions(&self) -> &ConditionState {
        &self.conditions
    }

    /// Status of one condition.
    pub fn status(&self, name: &str) -> ConditionStatus {
        self.conditions.status(name)
    }

    /// The template being validated.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Shared handle to the template.
    pub fn template_arc(&self) -> &Arc<Template> {
        &self.template
    }

    /// Functions legal at this position.
    pub fn functions(&self) -> FunctionSet {
        self.functions
    }

    /// Whether the instance being validated came from the resolver.
    pub fn resolved_value(&self) -> bool {
        self.resolved_value
    }

    /// Whether scalar types must match exactly.
    pub fn strict_types(&self) -> bool {
        self.strict_types
    }

    /// Whether pseudo-parameters resolve to their per-region values.
    pub fn resolve_pseudo_parameters(&self) -> bool {
        self.resolve_pseudo_parameters
    }

    /// Type of the enclosing resource, if any.
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::for_region(
            Arc::new(Template::default()),
            Region::new("us-east-1").expect("valid region"),
        )
    }
}
