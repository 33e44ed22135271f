//! # Function Resolver
//!
//! Turns an intrinsic-function invocation into the finite set of concrete
//! values it can statically take under a [`Context`].
//!
//! ## Contract
//!
//! `resolve(ctx, value)` returns one or more [`Candidate`]s, each a concrete
//! value plus the condition assumptions under which it holds, or a
//! [`ResolveError`]:
//!
//! - `Unpredictable` when the value depends on deploy-time information
//!   (resource attributes, SSM parameters, imports). Callers stop validating
//!   that value; it is never a finding.
//! - `Invalid` when the invocation is provably wrong (missing mapping key,
//!   index out of range, malformed arguments). Its `path` starts at the
//!   resolved function node and leads to the argument at fault, through
//!   any nested invocations, so cached results stay location-independent.
//!   Its `function` names the invocation that raised it.
//!
//! An empty success is never returned: zero candidates become
//! `Unpredictable`.
//!
//! ## Removed Values
//!
//! Inside the resolver `{"Ref": "AWS::NoValue"}` resolves to itself, so an
//! `Fn::If` branch that removes a value is a candidate of its own. A list
//! drops such elements and an object drops such keys, so `["a", {"Fn::If": ["C", "b", NoValue]}]` resolves to `["a", "b"]`
//! under `C` and `["a"]` otherwise. Function arguments skip them, and
//! [`Resolver::resolve`] never returns them.
//!
//! ## Composition
//!
//! Nested invocations resolve recursively. Lists and objects form a cross
//! product in which each element resolves under the context evolved by the
//! assumptions of the elements before it, so an `Fn::If` on `IsProd` and a
//! later `Fn::If` on `IsDev` never combine branches that cannot hold
//! together. Products and results are capped at `max_candidates`.
//!
//! ## Caching
//!
//! Results are memoized in a pass-scoped [`ResolveCache`] keyed by the
//! content digest of (expression, regions, condition assumptions, pseudo
//! parameter mode).

mod conditional;
mod lookup;
pub mod pseudo;
mod strings;

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use stacklint_core::{sha256_digest, CanonicalBytes, ContentDigest, PathSegment, Region};

use crate::context::{Changes, Context};
use crate::error::ResolveError;
use crate::functions::{as_function, is_no_value, Function};

pub use strings::{sub_variables, SubPart};

/// One statically derivable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The concrete value.
    pub value: Value,
    /// Condition values assumed to reach this value.
    pub assumptions: BTreeMap<String, bool>,
}

impl Candidate {
    /// A value that holds unconditionally.
    pub fn plain(value: Value) -> Self {
        Self {
            value,
            assumptions: BTreeMap::new(),
        }
    }
}

type Resolved = Result<Vec<Candidate>, ResolveError>;

/// Resolved items of a product with the assumptions they share.
pub(crate) type Product = Vec<(Vec<Value>, BTreeMap<String, bool>)>;

/// Pass-scoped memo of resolution results.
#[derive(Debug, Default)]
pub struct ResolveCache {
    entries: Mutex<HashMap<ContentDigest, Resolved>>,
    hits: Mutex<u64>,
}

impl ResolveCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &ContentDigest) -> Option<Resolved> {
        let found = self.entries.lock().get(key).cloned();
        if found.is_some() {
            *self.hits.lock() += 1;
        }
        found
    }

    fn insert(&self, key: ContentDigest, value: Resolved) {
        self.entries.lock().insert(key, value);
    }

    /// Number of memoized expressions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Lookups answered from the memo.
    pub fn hits(&self) -> u64 {
        *self.hits.lock()
    }
}

/// Resolves intrinsic functions for one validation pass.
#[derive(Debug)]
pub struct Resolver {
    cache: ResolveCache,
    max_candidates: usize,
}

impl Resolver {
    /// A resolver with a fresh cache.
    pub fn new(max_candidates: usize) -> Self {
        Self {
            cache: ResolveCache::new(),
            max_candidates: max_candidates.max(1),
        }
    }

    /// The pass-scoped cache.
    pub fn cache(&self) -> &ResolveCache {
        &self.cache
    }

    /// Upper bound on candidates per expression.
    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Resolve `value` under `ctx`.
    ///
    /// Plain values resolve to themselves; lists and objects resolve any
    /// functions they contain. A value removed by `AWS::NoValue` in every
    /// reachable scenario is `Unpredictable`.
    pub fn resolve(&self, ctx: &Context, value: &Value) -> Resolved {
        let candidates = present(self.resolve_value(ctx, value)?);
        if candidates.is_empty() {
            let function = as_function(value).map_or(Function::Ref, |(f, _)| f);
            return Err(ResolveError::unpredictable(
                function.name(),
                "AWS::NoValue removes the value",
            ));
        }
        Ok(candidates)
    }

    /// Resolve without dropping `AWS::NoValue` candidates.
    pub(crate) fn resolve_value(&self, ctx: &Context, value: &Value) -> Resolved {
        if let Some((function, args)) = as_function(value) {
            return self.resolve_function(ctx, function, args, value);
        }
        match value {
            Value::Array(items) => Ok(self
                .product(ctx, items)?
                .into_iter()
                .map(|(values, assumptions)| Candidate {
                    value: Value::Array(values.into_iter().filter(|v| !is_no_value(v)).collect()),
                    assumptions,
                })
                .collect()),
            Value::Object(map) if crate::functions::contains_function(value) => {
                let keys: Vec<&String> = map.keys().collect();
                let positioned: Vec<(Vec<PathSegment>, &Value)> = map
                    .iter()
                    .map(|(k, v)| (vec![PathSegment::from(k.as_str())], v))
                    .collect();
                Ok(self
                    .product_at(ctx, &positioned)?
                    .into_iter()
                    .map(|(resolved, assumptions)| {
                        let object: Map<String, Value> = keys
                            .iter()
                            .map(|k| (*k).clone())
                            .zip(resolved)
                            .filter(|(_, v)| !is_no_value(v))
                            .collect();
                        Candidate {
                            value: Value::Object(object),
                            assumptions,
                        }
                    })
                    .collect())
            }
            other => Ok(vec![Candidate::plain(other.clone())]),
        }
    }

    /// [`resolve_value`](Self::resolve_value) for a value found at `prefix`
    /// inside a function's arguments.
    pub(crate) fn resolve_at(&self, ctx: &Context, value: &Value, prefix: &[PathSegment]) -> Resolved {
        self.resolve_value(ctx, value).map_err(|e| e.within(prefix))
    }

    /// [`resolve_at`](Self::resolve_at) for an argument consumed by a
    /// function. Removed values are skipped.
    pub(crate) fn resolve_argument(&self, ctx: &Context, value: &Value, prefix: &[PathSegment]) -> Resolved {
        self.resolve_at(ctx, value, prefix).map(present)
    }

    fn resolve_function(
        &self,
        ctx: &Context,
        function: Function,
        args: &Value,
        expression: &Value,
    ) -> Resolved {
        let key = cache_key(ctx, expression);
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let result = match function {
            Function::Ref => lookup::resolve_ref(ctx, args),
            Function::GetAtt => lookup::resolve_get_att(args),
            Function::FindInMap => lookup::resolve_find_in_map(self, ctx, args),
            Function::GetAZs => lookup::resolve_get_azs(self, ctx, args),
            Function::ImportValue => Err(ResolveError::unpredictable(
                function.name(),
                "exported values are only known at deploy time",
            )),
            Function::Cidr => Err(ResolveError::unpredictable(
                function.name(),
                "CIDR blocks are not derived statically",
            )),
            Function::Join => strings::resolve_join(self, ctx, args),
            Function::Split => strings::resolve_split(self, ctx, args),
            Function::Sub => strings::resolve_sub(self, ctx, args),
            Function::Select => strings::resolve_select(self, ctx, args),
            Function::Base64 => strings::resolve_base64(self, ctx, args),
            Function::Length => strings::resolve_length(self, ctx, args),
            Function::ToJsonString => strings::resolve_to_json_string(self, ctx, args),
            Function::If => conditional::resolve_if(self, ctx, args),
        };
        let result = result
            .map_err(|e| e.within(&[PathSegment::from(function.name())]))
            .and_then(|mut candidates| {
                if candidates.is_empty() {
                    return Err(ResolveError::unpredictable(
                        function.name(),
                        "no reachable value",
                    ));
                }
                dedupe(&mut candidates);
                if candidates.len() > self.max_candidates {
                    tracing::debug!(
                        function = function.name(),
                        found = candidates.len(),
                        limit = self.max_candidates,
                        "candidate set truncated"
                    );
                    candidates.truncate(self.max_candidates);
                }
                Ok(candidates)
            });
        self.cache.insert(key, result.clone());
        result
    }

    /// Condition-consistent cross product of resolving each item, the items
    /// being the elements of an argument list.
    pub(crate) fn product(&self, ctx: &Context, items: &[Value]) -> Result<Product, ResolveError> {
        let positioned: Vec<(Vec<PathSegment>, &Value)> = items
            .iter()
            .enumerate()
            .map(|(index, item)| (vec![PathSegment::from(index)], item))
            .collect();
        self.product_at(ctx, &positioned)
    }

    /// Cross product over items at explicit positions. An `Invalid` from an
    /// item is reported under its position.
    pub(crate) fn product_at(
        &self,
        ctx: &Context,
        items: &[(Vec<PathSegment>, &Value)],
    ) -> Result<Product, ResolveError> {
        let mut partials: Product = vec![(Vec::with_capacity(items.len()), BTreeMap::new())];
        for (position, item) in items {
            let mut next = Vec::new();
            'partials: for (values, assumptions) in &partials {
                let item_ctx = if assumptions.is_empty() {
                    ctx.clone()
                } else {
                    match ctx.evolve(Changes::new().conditions(assumptions)) {
                        Ok(c) => c,
                        Err(_) => continue,
                    }
                };
                for candidate in self.resolve_at(&item_ctx, item, position)? {
                    let mut merged = assumptions.clone();
                    merged.extend(candidate.assumptions);
                    let mut values = values.clone();
                    values.push(candidate.value);
                    next.push((values, merged));
                    if next.len() >= self.max_candidates {
                        break 'partials;
                    }
                }
            }
            if next.is_empty() {
                return Ok(next);
            }
            partials = next;
        }
        Ok(partials)
    }
}

/// Drop candidates removed by `AWS::NoValue`.
pub(crate) fn present(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.retain(|c| !is_no_value(&c.value));
    candidates
}

/// Whether every item of a product row is an actual value.
pub(crate) fn all_present(values: &[Value]) -> bool {
    !values.iter().any(is_no_value)
}

/// `" when C is false"`-style text for a message scoped by assumptions.
pub(crate) fn when(assumptions: &BTreeMap<String, bool>) -> String {
    if assumptions.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = assumptions
        .iter()
        .map(|(name, value)| format!("'{name}' is {value}"))
        .collect();
    format!(" when {}", parts.join(" and "))
}

fn dedupe(candidates: &mut Vec<Candidate>) {
    let mut seen = Vec::with_capacity(candidates.len());
    candidates.retain(|c| {
        if seen.contains(c) {
            false
        } else {
            seen.push(c.clone());
            true
        }
    });
}

fn cache_key(ctx: &Context, expression: &Value) -> ContentDigest {
    let regions: Vec<&str> = ctx.regions().iter().map(Region::as_str).collect();
    sha256_digest(&CanonicalBytes::from_json(&json!({
        "expr": expression,
        "regions": regions,
        "assume": ctx.conditions().assignments(),
        "pseudo": ctx.resolve_pseudo_parameters(),
    })))
}

/// String form of a scalar candidate value.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// An `Invalid` raised by `function`, at `path` within its arguments.
pub(crate) fn invalid(function: Function, message: impl Into<String>, path: Vec<PathSegment>) -> ResolveError {
    ResolveError::Invalid {
        function: function.name().to_string(),
        message: message.into(),
        path,
    }
}
