//! # Validator — Schema Dispatch Loop
//!
//! Walks an instance against a schema. At each node the loop either
//! dispatches the schema's keywords to their registered checks, or, when the
//! instance is an intrinsic function, handles the function:
//!
//! 1. A function not legal at this position is an error under the
//!    function's rule.
//! 2. Function-aware checks registered under the function keyword (`ref`,
//!    `fn_join`, ...) run on the arguments.
//! 3. `Fn::If` descends into each branch that is reachable under the
//!    current condition assumptions, with the branch condition assumed.
//! 4. Every other function is resolved and each candidate is re-validated
//!    against the same schema; messages gain `when '<fn>' is resolved`.
//!
//! `Unpredictable`, `Unsatisfiable` and `UnknownSatisfaction` end a branch
//! without findings. A resolver `Invalid` is reported under the rule of the
//! function that raised it, which may be nested inside the resolved one.
//!
//! A `$ref` already followed at the same instance path is not followed
//! again, so self-referential schemas terminate.
//!
//! The validator owns nothing: it borrows the registry, resolver and schema
//! store of the pass and holds one immutable [`Context`].

use serde_json::{Map, Value};

use stacklint_conditions::ConditionError;
use stacklint_core::{PathSegment, Region};
use stacklint_schema::SchemaStore;

use crate::builtin::builtin;
use crate::context::{Changes, Context};
use crate::diagnostic::ValidationError;
use crate::error::ResolveError;
use crate::functions::{as_function, is_no_value, Function};
use crate::registry::{CheckNode, Registry};
use crate::resolver::{Candidate, Resolver};

/// Validates instances against schemas under one [`Context`].
#[derive(Clone)]
pub struct Validator<'a> {
    ctx: Context,
    registry: &'a Registry,
    resolver: &'a Resolver,
    store: Option<&'a dyn SchemaStore>,
    root: &'a Value,
    /// `$ref`s followed at the current instance path.
    refs: Vec<String>,
}

impl<'a> Validator<'a> {
    /// A validator over `root_schema`, the document `$ref`s resolve against.
    pub fn new(ctx: Context, registry: &'a Registry, resolver: &'a Resolver, root_schema: &'a Value) -> Self {
        Self {
            ctx,
            registry,
            resolver,
            store: None,
            root: root_schema,
            refs: Vec::new(),
        }
    }

    /// Give checks access to the schema store.
    pub fn with_store(mut self, store: &'a dyn SchemaStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The current context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn resolver(&self) -> &'a Resolver {
        self.resolver
    }

    pub fn store(&self) -> Option<&'a dyn SchemaStore> {
        self.store
    }

    /// The root schema `$ref`s resolve against.
    pub fn root_schema(&self) -> &'a Value {
        self.root
    }

    /// The first region of the pass.
    pub fn region(&self) -> Option<&Region> {
        self.ctx.regions().first()
    }

    /// The same borrows under another context.
    pub fn with_context(&self, ctx: Context) -> Validator<'a> {
        let refs = if ctx.path() == self.ctx.path() {
            self.refs.clone()
        } else {
            Vec::new()
        };
        Validator {
            ctx,
            registry: self.registry,
            resolver: self.resolver,
            store: self.store,
            root: self.root,
            refs,
        }
    }

    /// Evolve the context.
    ///
    /// # Errors
    ///
    /// Propagates condition errors from [`Context::evolve`].
    pub fn evolve(&self, changes: Changes) -> Result<Validator<'a>, ConditionError> {
        Ok(self.with_context(self.ctx.evolve(changes)?))
    }

    /// An unattributed error at the current position.
    pub fn error(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::new(&self.ctx, message)
    }

    /// Resolve `value` under the current context.
    pub fn resolve(&self, value: &Value) -> Result<Vec<Candidate>, ResolveError> {
        self.resolver.resolve(&self.ctx, value)
    }

    /// Validate under an evolved context. An unsatisfiable evolution
    /// yields no errors.
    pub fn descend(&self, instance: &Value, schema: &Value, changes: Changes) -> Vec<ValidationError> {
        match self.evolve(changes) {
            Ok(next) => next.validate(instance, schema),
            Err(e) => {
                tracing::trace!(path = %self.ctx.path().display_path(), error = %e, "branch abandoned");
                Vec::new()
            }
        }
    }

    /// Validate the value of property `key`.
    pub fn descend_into_property(&self, instance: &Value, schema: &Value, key: &str) -> Vec<ValidationError> {
        self.with_context(self.ctx.child(key)).validate(instance, schema)
    }

    /// Validate list item `index`.
    pub fn descend_into_item(&self, instance: &Value, schema: &Value, index: usize) -> Vec<ValidationError> {
        self.with_context(self.ctx.child(index)).validate(instance, schema)
    }

    /// Whether `instance` passes `schema` here.
    pub fn is_valid(&self, instance: &Value, schema: &Value) -> bool {
        self.validate(instance, schema).is_empty()
    }

    /// Run the children of `node` registered under `keyword`, attributing
    /// their errors to the child rules.
    pub fn run_children(
        &self,
        node: &CheckNode,
        keyword: &str,
        keyword_value: &Value,
        instance: &Value,
        schema: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for child in node.children().iter().filter(|c| c.keyword() == keyword) {
            for mut e in child.check().validate(self, child, keyword_value, instance, schema) {
                e.attribute(child.keyword(), child.meta());
                errors.push(e);
            }
        }
        errors
    }

    /// Validate `instance` against `schema`.
    pub fn validate(&self, instance: &Value, schema: &Value) -> Vec<ValidationError> {
        let map = match schema {
            Value::Object(map) => map,
            Value::Bool(false) => {
                return vec![self
                    .error(format!("{instance} is not allowed"))
                    .with_rule("false", &builtin().properties)]
            }
            _ => return Vec::new(),
        };

        if let Some((function, args)) = as_function(instance) {
            return self.validate_function(function, args, instance, schema, map);
        }

        if let Some(Value::String(reference)) = map.get("$ref") {
            if self.refs.contains(reference) {
                tracing::warn!(reference = %reference, "cyclic $ref in schema");
                return Vec::new();
            }
            return match self.lookup_ref(reference) {
                Some(target) => {
                    let mut next = self.clone();
                    next.refs.push(reference.clone());
                    next.validate(instance, target)
                }
                None => {
                    tracing::warn!(reference = %reference, "unresolvable $ref in schema");
                    Vec::new()
                }
            };
        }

        let mut errors = Vec::new();
        for (keyword, keyword_value) in map {
            for node in self.registry.checks(keyword) {
                for mut e in node.check().validate(self, node, keyword_value, instance, map) {
                    e.attribute(keyword, node.meta());
                    errors.push(e);
                }
            }
        }
        errors
    }

    fn lookup_ref(&self, reference: &str) -> Option<&'a Value> {
        match reference {
            "#" => Some(self.root),
            r => r.strip_prefix('#').and_then(|pointer| self.root.pointer(pointer)),
        }
    }

    fn validate_function(
        &self,
        function: Function,
        args: &Value,
        instance: &Value,
        schema: &Value,
        map: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let rule = builtin().function(function);
        if !self.ctx.functions().contains(function) {
            return vec![self
                .error(format!("{function} is not supported here"))
                .with_rule(function.keyword(), rule)];
        }

        let mut errors = Vec::new();
        for node in self.registry.checks(function.keyword()) {
            for mut e in node.check().validate(self, node, args, instance, map) {
                e.attribute(function.keyword(), node.meta());
                errors.push(e);
            }
        }

        if is_no_value(instance) {
            return errors;
        }
        if function == Function::If {
            errors.extend(self.validate_if(args, schema));
            return errors;
        }

        match self.resolve(instance) {
            Ok(candidates) => errors.extend(self.validate_candidates(function, candidates, schema)),
            Err(ResolveError::Unpredictable { function: f, reason }) => {
                tracing::trace!(
                    path = %self.ctx.path().display_path(),
                    function = %f,
                    %reason,
                    "value not validated"
                );
            }
            Err(ResolveError::Invalid {
                function: raised,
                message,
                path,
            }) => {
                let origin = Function::from_name(&raised).unwrap_or(function);
                let mut e = self
                    .error(message)
                    .with_rule(origin.keyword(), builtin().function(origin));
                e.path.extend(path);
                errors.push(e);
            }
        }
        errors
    }

    fn validate_if(&self, args: &Value, schema: &Value) -> Vec<ValidationError> {
        let rule = builtin().function(Function::If);
        let (name, branches) = match args {
            Value::Array(items) if items.len() == 3 => match &items[0] {
                Value::String(name) => (name, [(1usize, true, &items[1]), (2, false, &items[2])]),
                _ => {
                    return vec![self
                        .error("Fn::If condition name must be a string")
                        .with_rule(Function::If.keyword(), rule)]
                }
            },
            _ => {
                return vec![self
                    .error("Fn::If expects [condition, value if true, value if false]")
                    .with_rule(Function::If.keyword(), rule)]
            }
        };

        if let Err(e @ ConditionError::UnknownSatisfaction { .. }) = self.ctx.conditions().set().condition(name) {
            let mut err = self.error(e.to_string()).with_rule(Function::If.keyword(), rule);
            err.path.extend([PathSegment::from(Function::If.name()), PathSegment::Index(0)]);
            return vec![err];
        }

        let mut errors = Vec::new();
        for (index, value, branch) in branches {
            errors.extend(self.descend(
                branch,
                schema,
                Changes::new()
                    .enter_function(Function::If)
                    .enter_branch(index)
                    .condition(name.as_str(), value),
            ));
        }
        errors
    }

    fn validate_candidates(
        &self,
        function: Function,
        candidates: Vec<Candidate>,
        schema: &Value,
    ) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = Vec::new();
        for candidate in candidates {
            let changes = Changes::new()
                .conditions(&candidate.assumptions)
                .resolved_value(true);
            let Ok(scoped) = self.evolve(changes) else {
                continue;
            };
            for mut e in scoped.validate(&candidate.value, schema) {
                e.message = format!("{} when '{}' is resolved", e.message, function.name());
                if !errors.contains(&e) {
                    errors.push(e);
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use stacklint_core::Template;

    use crate::diagnostic::RuleMeta;
    use crate::registry::{KeywordCheck, RegistryBuilder};

    /// Minimal `enum` check for exercising the loop.
    struct Enum;

    impl KeywordCheck for Enum {
        fn validate(
            &self,
            v: &Validator<'_>,
            _: &CheckNode,
            keyword_value: &Value,
            instance: &Value,
            _: &Map<String, Value>,
        ) -> Vec<ValidationError> {
            let allowed = keyword_value.as_array().cloned().unwrap_or_default();
            if allowed.contains(instance) {
                Vec::new()
            } else {
                vec![v.error(format!("{instance} is not one of {keyword_value}"))]
            }
        }
    }

    struct Properties;

    impl KeywordCheck for Properties {
        fn validate(
            &self,
            v: &Validator<'_>,
            _: &CheckNode,
            keyword_value: &Value,
            instance: &Value,
            _: &Map<String, Value>,
        ) -> Vec<ValidationError> {
            let (Some(props), Some(object)) = (keyword_value.as_object(), instance.as_object()) else {
                return Vec::new();
            };
            object
                .iter()
                .filter_map(|(k, value)| props.get(k).map(|s| (k, value, s)))
                .flat_map(|(k, value, s)| v.descend_into_property(value, s, k))
                .collect()
        }
    }

    fn registry() -> Registry {
        RegistryBuilder::new()
            .register("enum", RuleMeta::new("E3030", "enum").unwrap(), Arc::new(Enum))
            .register("properties", RuleMeta::new("E9002", "props").unwrap(), Arc::new(Properties))
            .build()
            .unwrap()
    }

    fn template() -> Arc<Template> {
        Arc::new(
            Template::from_value(json!({
                "Parameters": {"Env": {"Type": "String", "AllowedValues": ["dev", "prod"]}},
                "Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}},
                "Mappings": {"M": {"dev": {"V": "a"}, "prod": {"V": "z"}}}
            }))
            .unwrap(),
        )
    }

    fn run(instance: Value, schema: Value) -> Vec<ValidationError> {
        let registry = RegistryBuilder::new()
            .register("enum", RuleMeta::new("E3030", "enum").unwrap(), Arc::new(Enum))
            .build()
            .unwrap();
        let resolver = Resolver::new(25);
        let ctx = Context::for_region(template(), Region::new("us-east-1").unwrap());
        let root = schema.clone();
        Validator::new(ctx, &registry, &resolver, &root).validate(&instance, &schema)
    }

    #[test]
    fn test_keyword_and_rule_attached() {
        let errors = run(json!("c"), json!({"enum": ["a", "b"]}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].keyword.as_deref(), Some("enum"));
        assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E3030"));
    }

    #[test]
    fn test_resolved_candidates_carry_suffix() {
        let errors = run(
            json!({"Fn::FindInMap": ["M", {"Ref": "Env"}, "V"]}),
            json!({"enum": ["a", "b"]}),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.ends_with("when 'Fn::FindInMap' is resolved"));
        assert!(errors[0].message.contains("\"z\""));
    }

    #[test]
    fn test_if_branches_are_walked() {
        let errors = run(
            json!({"Fn::If": ["IsProd", "a", "c"]}),
            json!({"enum": ["a", "b"]}),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            stacklint_core::path::render(&errors[0].path),
            "Fn::If/2"
        );
    }

    #[test]
    fn test_unpredictable_is_silent() {
        assert!(run(json!({"Fn::GetAtt": ["X", "Arn"]}), json!({"enum": ["a"]})).is_empty());
        assert!(run(json!({"Ref": "AWS::NoValue"}), json!({"enum": ["a"]})).is_empty());
    }

    #[test]
    fn test_resolver_invalid_is_reported() {
        let errors = run(
            json!({"Fn::FindInMap": ["M", "test", "V"]}),
            json!({"enum": ["a"]}),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E1011"));
        assert_eq!(
            stacklint_core::path::render(&errors[0].path),
            "Fn::FindInMap/1"
        );
    }

    #[test]
    fn test_nested_invalid_uses_inner_function_rule_and_path() {
        let errors = run(
            json!({"Fn::Join": ["-", ["x", {"Fn::Select": [5, ["a"]]}]]}),
            json!({"enum": ["a"]}),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E1017"));
        assert_eq!(errors[0].keyword.as_deref(), Some("fn_select"));
        assert_eq!(
            stacklint_core::path::render(&errors[0].path),
            "Fn::Join/1/1/Fn::Select/0"
        );
    }

    #[test]
    fn test_self_referential_schema_terminates() {
        let registry = registry();
        let resolver = Resolver::new(25);
        let ctx = Context::for_region(template(), Region::new("us-east-1").unwrap());
        let root = json!({
            "definitions": {
                "A": {"$ref": "#/definitions/B"},
                "B": {"$ref": "#/definitions/A"},
                "Node": {"properties": {"Child": {"$ref": "#/definitions/Node"}, "Size": {"enum": ["a"]}}}
            },
            "properties": {"Loop": {"$ref": "#/definitions/A"}, "Tree": {"$ref": "#/definitions/Node"}}
        });
        let errors = Validator::new(ctx, &registry, &resolver, &root).validate(
            &json!({"Loop": "x", "Tree": {"Child": {"Child": {"Size": "b"}}}}),
            &root,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(stacklint_core::path::render(&errors[0].path), "Tree/Child/Child/Size");
    }

    #[test]
    fn test_undefined_if_condition_is_reported() {
        let errors = run(json!({"Fn::If": ["Nope", "a", "b"]}), json!({"enum": ["a", "b"]}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E1028"));
    }

    #[test]
    fn test_disallowed_function() {
        let registry = registry();
        let resolver = Resolver::new(25);
        let ctx = Context::for_region(template(), Region::new("us-east-1").unwrap())
            .evolve(Changes::new().functions(crate::functions::FunctionSet::none()))
            .unwrap();
        let schema = json!({});
        let errors = Validator::new(ctx, &registry, &resolver, &schema)
            .validate(&json!({"Ref": "Env"}), &schema);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E1020"));
    }

    #[test]
    fn test_ref_and_nested_paths() {
        let registry = registry();
        let resolver = Resolver::new(25);
        let ctx = Context::for_region(template(), Region::new("us-east-1").unwrap());
        let root = json!({
            "definitions": {"Size": {"enum": ["a"]}},
            "properties": {"Size": {"$ref": "#/definitions/Size"}}
        });
        let errors = Validator::new(ctx, &registry, &resolver, &root)
            .validate(&json!({"Size": "b"}), &root);
        assert_eq!(errors.len(), 1);
        assert_eq!(stacklint_core::path::render(&errors[0].path), "Size");
        assert_eq!(errors[0].schema_path, vec!["Size".to_string()]);
    }
}
