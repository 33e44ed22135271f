//! # Rule Registry
//!
//! Maps schema keywords (and function keywords such as `fn_if`) to the
//! checks that run when the dispatch loop meets them.
//!
//! ## Design
//!
//! Checks implement [`KeywordCheck`] and register with a [`RuleMeta`].
//! A check may also register as a *child* of another rule; children are
//! assembled into an explicit [`CheckNode`] tree once, at build time, and
//! the parent decides when to invoke them through
//! [`Validator::run_children`](crate::validator::Validator::run_children).
//!
//! ## Invariants
//!
//! - Rule ids are unique across registered checks and engine-owned rules,
//!   except that a check under a function keyword may share that
//!   function's engine rule.
//! - Every child names a registered parent.
//! - Every declared keyword has at least one check.
//!
//! Violations are [`ConfigurationError`]s from [`RegistryBuilder::build`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::builtin::builtin;
use crate::diagnostic::{RuleMeta, ValidationError};
use crate::error::ConfigurationError;
use crate::validator::Validator;

/// A pluggable check for one schema keyword.
pub trait KeywordCheck: Send + Sync {
    /// Validate `instance` against `keyword_value`, the value of the
    /// keyword in `schema`.
    fn validate(
        &self,
        validator: &Validator<'_>,
        node: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        schema: &Map<String, Value>,
    ) -> Vec<ValidationError>;
}

/// A registered check and the child checks it owns.
pub struct CheckNode {
    keyword: String,
    meta: RuleMeta,
    check: Arc<dyn KeywordCheck>,
    children: Vec<Arc<CheckNode>>,
}

impl CheckNode {
    /// Keyword the check is registered under.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Rule identity.
    pub fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    /// The check itself.
    pub fn check(&self) -> &dyn KeywordCheck {
        self.check.as_ref()
    }

    /// Children in registration order.
    pub fn children(&self) -> &[Arc<CheckNode>] {
        &self.children
    }
}

impl fmt::Debug for CheckNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckNode")
            .field("keyword", &self.keyword)
            .field("rule", &self.meta.id())
            .field("children", &self.children)
            .finish()
    }
}

// ── Builder ──────────────────────────────────────────────────────────

struct Pending {
    keyword: String,
    meta: RuleMeta,
    check: Arc<dyn KeywordCheck>,
    parent: Option<String>,
}

/// Collects checks and assembles an immutable [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<Pending>,
    declared: BTreeSet<String>,
}

impl RegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level check for `keyword`.
    pub fn register(
        mut self,
        keyword: impl Into<String>,
        meta: RuleMeta,
        check: Arc<dyn KeywordCheck>,
    ) -> Self {
        self.pending.push(Pending {
            keyword: keyword.into(),
            meta,
            check,
            parent: None,
        });
        self
    }

    /// Register a check owned by the rule `parent_id`. `keyword` is the
    /// name the parent dispatches on.
    pub fn register_child(
        mut self,
        parent_id: impl Into<String>,
        keyword: impl Into<String>,
        meta: RuleMeta,
        check: Arc<dyn KeywordCheck>,
    ) -> Self {
        self.pending.push(Pending {
            keyword: keyword.into(),
            meta,
            check,
            parent: Some(parent_id.into()),
        });
        self
    }

    /// Require that each of `keywords` has at least one top-level check.
    pub fn declare_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Assemble the registry.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::DuplicateRule`] if a rule id repeats.
    /// - [`ConfigurationError::UnknownParent`] if a child names a rule that
    ///   was not registered.
    /// - [`ConfigurationError::KeywordWithoutChecks`] if a declared keyword
    ///   has no top-level check.
    pub fn build(self) -> Result<Registry, ConfigurationError> {
        let mut rules: BTreeMap<String, RuleMeta> = BTreeMap::new();
        for meta in builtin().all() {
            rules.insert(meta.id().to_string(), meta.clone());
        }
        let mut seen = BTreeSet::new();
        for p in &self.pending {
            let id = p.meta.id();
            let extends_builtin = p.parent.is_none()
                && builtin()
                    .function_of(id)
                    .is_some_and(|f| f.keyword() == p.keyword);
            if !seen.insert(id) || (rules.contains_key(id) && !extends_builtin) {
                return Err(ConfigurationError::DuplicateRule(id.to_string()));
            }
            rules.entry(id.to_string()).or_insert_with(|| p.meta.clone());
        }
        for p in &self.pending {
            if let Some(parent) = &p.parent {
                if !self.pending.iter().any(|q| q.meta.id() == parent) {
                    return Err(ConfigurationError::UnknownParent {
                        parent: parent.clone(),
                        child: p.meta.id().to_string(),
                    });
                }
            }
        }

        let mut by_keyword: BTreeMap<String, Vec<Arc<CheckNode>>> = BTreeMap::new();
        for p in self.pending.iter().filter(|p| p.parent.is_none()) {
            let node = assemble(p, &self.pending, &mut Vec::new())?;
            by_keyword
                .entry(p.keyword.clone())
                .or_default()
                .push(Arc::new(node));
        }
        if let Some(missing) = self.declared.iter().find(|k| !by_keyword.contains_key(*k)) {
            return Err(ConfigurationError::KeywordWithoutChecks(missing.clone()));
        }

        tracing::debug!(
            rules = rules.len(),
            keywords = by_keyword.len(),
            "rule registry built"
        );
        Ok(Registry { by_keyword, rules })
    }
}

fn assemble(
    entry: &Pending,
    all: &[Pending],
    ancestors: &mut Vec<String>,
) -> Result<CheckNode, ConfigurationError> {
    let id = entry.meta.id().to_string();
    if ancestors.contains(&id) {
        return Err(ConfigurationError::Invalid(format!(
            "rule {id} is its own ancestor"
        )));
    }
    ancestors.push(id.clone());
    let mut children = Vec::new();
    for child in all.iter().filter(|c| c.parent.as_deref() == Some(id.as_str())) {
        children.push(Arc::new(assemble(child, all, ancestors)?));
    }
    ancestors.pop();
    Ok(CheckNode {
        keyword: entry.keyword.clone(),
        meta: entry.meta.clone(),
        check: Arc::clone(&entry.check),
        children,
    })
}

// ── Registry ─────────────────────────────────────────────────────────

/// Immutable keyword-to-check map shared by every validation pass.
#[derive(Debug, Default)]
pub struct Registry {
    by_keyword: BTreeMap<String, Vec<Arc<CheckNode>>>,
    rules: BTreeMap<String, RuleMeta>,
}

impl Registry {
    /// Top-level checks for `keyword`, in registration order.
    pub fn checks(&self, keyword: &str) -> &[Arc<CheckNode>] {
        self.by_keyword.get(keyword).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Metadata of any known rule, including engine-owned ones.
    pub fn rule(&self, id: &str) -> Option<&RuleMeta> {
        self.rules.get(id)
    }

    /// Every known rule, sorted by id.
    pub fn rules(&self) -> impl Iterator<Item = &RuleMeta> {
        self.rules.values()
    }

    /// Keywords with at least one check, sorted.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.by_keyword.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl KeywordCheck for Noop {
        fn validate(
            &self,
            _: &Validator<'_>,
            _: &CheckNode,
            _: &Value,
            _: &Value,
            _: &Map<String, Value>,
        ) -> Vec<ValidationError> {
            Vec::new()
        }
    }

    fn rule(id: &str) -> RuleMeta {
        RuleMeta::new(id, "test rule").unwrap()
    }

    #[test]
    fn test_children_attach_to_parent() {
        let registry = RegistryBuilder::new()
            .register("cfnLint", rule("E9000"), Arc::new(Noop))
            .register_child("E9000", "AvailabilityZone", rule("W9001"), Arc::new(Noop))
            .build()
            .unwrap();
        let parents = registry.checks("cfnLint");
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].children().len(), 1);
        assert_eq!(parents[0].children()[0].keyword(), "AvailabilityZone");
        assert!(registry.checks("AvailabilityZone").is_empty());
        assert!(registry.rule("W9001").is_some());
        assert!(registry.rule("E1028").is_some());
    }

    #[test]
    fn test_unknown_parent_is_fatal() {
        let err = RegistryBuilder::new()
            .register_child("E9999", "x", rule("W9001"), Arc::new(Noop))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownParent {
                parent: "E9999".into(),
                child: "W9001".into()
            }
        );
    }

    #[test]
    fn test_duplicate_rule_is_fatal() {
        let err = RegistryBuilder::new()
            .register("type", rule("E9000"), Arc::new(Noop))
            .register("enum", rule("E9000"), Arc::new(Noop))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateRule("E9000".into()));

        let clash = RegistryBuilder::new()
            .register("type", rule("E1001"), Arc::new(Noop))
            .build()
            .unwrap_err();
        assert_eq!(clash, ConfigurationError::DuplicateRule("E1001".into()));

        let shared = RegistryBuilder::new()
            .register("fn_getatt", rule("E1010"), Arc::new(Noop))
            .build()
            .unwrap();
        assert_eq!(shared.checks("fn_getatt").len(), 1);
        assert!(RegistryBuilder::new()
            .register("ref", rule("E1010"), Arc::new(Noop))
            .build()
            .is_err());
    }

    #[test]
    fn test_declared_keyword_needs_a_check() {
        let err = RegistryBuilder::new()
            .register("type", rule("E9000"), Arc::new(Noop))
            .declare_keywords(["type", "enum"])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::KeywordWithoutChecks("enum".into()));
    }
}
