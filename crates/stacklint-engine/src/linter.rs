//! # Lint Pass
//!
//! Runs the dispatch loop over every resource of a template, once per
//! region, and merges the findings.
//!
//! ## Pass Structure
//!
//! 1. Template-structure and condition-definition issues become
//!    region-independent diagnostics, as do resource conditions that have
//!    no scenario in which they hold.
//! 2. Each region gets a fresh root [`Context`], resolver cache and
//!    satisfiability cache. Resources are visited in name order; a
//!    resource's `Condition` is assumed true while its `Properties` are
//!    validated against the schema of its type in that region.
//! 3. Findings with the same rule, path and message are merged across
//!    regions, ignored rules are dropped and the result is sorted by path.
//!
//! With `parallel_regions` enabled, step 2 runs on scoped threads. Results
//! are joined in region order, so the output is the same either way.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use stacklint_conditions::{ConditionError, ConditionSet, ConditionState, IssueKind};
use stacklint_core::{PathSegment, Region, Template};
use stacklint_schema::SchemaStore;

use crate::builtin::builtin;
use crate::config::LintConfig;
use crate::context::{Changes, Context};
use crate::diagnostic::{Diagnostic, ValidationError};
use crate::error::{ConfigurationError, LintError};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::validator::Validator;

/// Validates templates against a registry and schema store.
#[derive(Clone)]
pub struct Linter {
    registry: Arc<Registry>,
    store: Arc<dyn SchemaStore>,
    config: LintConfig,
}

impl std::fmt::Debug for Linter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linter")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Linter {
    /// Create a linter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] when `config` is out of range.
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn SchemaStore>,
        config: LintConfig,
    ) -> Result<Self, ConfigurationError> {
        config.check()?;
        for prefix in &config.ignore_checks {
            if !registry.rules().any(|r| r.id().starts_with(prefix.as_str())) {
                tracing::warn!(prefix = %prefix, "ignore_checks entry matches no rule");
            }
        }
        Ok(Self {
            registry,
            store,
            config,
        })
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse `document` as a template and lint it.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Template`] when the root is not a mapping.
    pub fn lint_value(&self, document: Value, regions: &[Region]) -> Result<Vec<Diagnostic>, LintError> {
        let template = Template::from_value(document)?;
        Ok(self.lint(&template, regions))
    }

    /// Lint `template` in `regions`, or in the configured regions when
    /// `regions` is empty.
    pub fn lint(&self, template: &Template, regions: &[Region]) -> Vec<Diagnostic> {
        let regions = if regions.is_empty() {
            self.config.effective_regions()
        } else {
            regions.to_vec()
        };
        if !template.transforms().is_empty() {
            tracing::debug!(transforms = ?template.transforms(), "template validated without expanding transforms");
        }

        let template = Arc::new(template.clone());
        let (set, issues) = ConditionSet::from_template(&template);
        let set = Arc::new(set);

        let rules = builtin();
        let mut found: Vec<Diagnostic> = template
            .issues()
            .iter()
            .map(|issue| Diagnostic::new(&rules.template, issue.message.clone(), issue.path.clone()))
            .collect();
        found.extend(issues.iter().map(|issue| {
            let rule = match issue.kind {
                IssueKind::Undefined { .. } => &rules.undefined_condition,
                _ => &rules.invalid_condition,
            };
            Diagnostic::new(rule, issue.message(), issue.path.clone())
        }));
        found.extend(self.unreachable_resources(&template, &set, &regions));

        let per_region: Vec<Vec<Diagnostic>> = if self.config.parallel_regions && regions.len() > 1 {
            let (template, set) = (&template, &set);
            std::thread::scope(|scope| {
                let handles: Vec<_> = regions
                    .iter()
                    .map(|region| scope.spawn(move || self.lint_region(template, set, region)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect()
            })
        } else {
            regions
                .iter()
                .map(|region| self.lint_region(&template, &set, region))
                .collect()
        };
        found.extend(per_region.into_iter().flatten());

        self.finish(found)
    }

    fn lint_region(&self, template: &Arc<Template>, set: &Arc<ConditionSet>, region: &Region) -> Vec<Diagnostic> {
        let state = ConditionState::new(Arc::clone(set), vec![region.clone()]);
        let root = Context::new(Arc::clone(template), state);
        let resolver = Resolver::new(self.config.max_candidates);
        let rules = builtin();
        let mut found = Vec::new();

        for (name, resource) in template.resources() {
            if resource.type_name.starts_with("Custom::")
                || resource.type_name == "AWS::CloudFormation::CustomResource"
            {
                continue;
            }
            let Some(schema) = self.store.resource_schema(&resource.type_name, region) else {
                let mut d = Diagnostic::new(
                    &rules.unknown_type,
                    format!("Resource type '{}' does not exist in '{region}'", resource.type_name),
                    resource_path(name, "Type"),
                );
                d.regions.push(region.clone());
                found.push(d);
                continue;
            };

            let mut changes = Changes::new()
                .push_document("Resources")
                .push_document(name.as_str())
                .push_document("Properties")
                .resource_type(resource.type_name.as_str())
                .strict_types(self.config.strict_types);
            if let Some(condition) = &resource.condition {
                changes = changes.condition(condition.as_str(), true);
            }
            let ctx = match root.evolve(changes) {
                Ok(ctx) => ctx,
                Err(ConditionError::UnknownSatisfaction { .. })
                    if resource
                        .condition
                        .as_ref()
                        .is_some_and(|c| !template.conditions().contains_key(c)) =>
                {
                    let mut d = Diagnostic::new(
                        &rules.undefined_condition,
                        format!(
                            "Condition '{}' of resource '{name}' is not defined",
                            resource.condition.as_deref().unwrap_or_default()
                        ),
                        resource_path(name, "Condition"),
                    );
                    d.regions.push(region.clone());
                    found.push(d);
                    continue;
                }
                Err(e) => {
                    tracing::debug!(resource = %name, %region, error = %e, "resource skipped");
                    continue;
                }
            };

            let properties = resource.properties.clone().unwrap_or_else(|| json!({}));
            let validator = Validator::new(ctx, &self.registry, &resolver, schema.schema())
                .with_store(self.store.as_ref());
            let errors = validator.validate(&properties, schema.schema());
            found.extend(errors.into_iter().map(|e| to_diagnostic(e, region)));
        }

        tracing::debug!(
            %region,
            resources = template.resources().len(),
            findings = found.len(),
            cached = resolver.cache().len(),
            "region linted"
        );
        found
    }

    /// Resources whose condition has no scenario in which it is true across
    /// the validated regions.
    fn unreachable_resources(&self, template: &Template, set: &ConditionSet, regions: &[Region]) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (name, resource) in template.resources() {
            let Some(condition) = resource.condition.as_deref().filter(|c| set.contains(c)) else {
                continue;
            };
            let space = match set.build_scenarios([condition], regions, self.config.max_scenario_leaves) {
                Ok(space) => space,
                Err(e) => {
                    tracing::debug!(resource = %name, condition, error = %e, "condition reachability not checked");
                    continue;
                }
            };
            if !space.iter().any(|s| s.get(condition) == Some(&true)) {
                out.push(Diagnostic::new(
                    &builtin().unreachable_condition,
                    format!("Resource '{name}' is never created: condition '{condition}' is never true"),
                    resource_path(name, "Condition"),
                ));
            }
        }
        out
    }

    fn finish(&self, found: Vec<Diagnostic>) -> Vec<Diagnostic> {
        let mut merged: BTreeMap<(String, Vec<PathSegment>, String), Diagnostic> = BTreeMap::new();
        for d in found {
            if self.config.is_ignored(&d.rule_id) {
                continue;
            }
            match merged.get_mut(&d.merge_key()) {
                Some(existing) => {
                    for region in d.regions {
                        if !existing.regions.contains(&region) {
                            existing.regions.push(region);
                        }
                    }
                }
                None => {
                    merged.insert(d.merge_key(), d);
                }
            }
        }
        let mut out: Vec<Diagnostic> = merged.into_values().collect();
        out.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
                .then_with(|| a.message.cmp(&b.message))
        });
        out
    }
}

fn resource_path(name: &str, key: &str) -> Vec<PathSegment> {
    vec!["Resources".into(), name.into(), key.into()]
}

fn to_diagnostic(error: ValidationError, region: &Region) -> Diagnostic {
    let rule = error.rule.as_ref().unwrap_or(&builtin().properties);
    Diagnostic {
        rule_id: rule.id().to_string(),
        severity: rule.severity(),
        message: error.message,
        path: error.path,
        schema_path: error.schema_path,
        regions: vec![region.clone()],
    }
}
