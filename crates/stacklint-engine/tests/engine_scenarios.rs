//! # Engine Scenarios
//!
//! End-to-end behavior of context, condition engine, resolver and dispatch
//! loop on small templates:
//!
//! - Region-equality conditions are fixed by the validated region.
//! - `Fn::If` on an assumed condition yields only the matching branch.
//! - Identically defined conditions are equivalent and cannot disagree.
//! - `Fn::Join` over a region reference and an unresolved `Fn::If` yields
//!   one candidate per branch.
//! - An unpredictable `Fn::GetAtt` stops value checks only: function-aware
//!   checks and sibling properties are still validated.
//! - A parameter referenced inside an `Fn::If` branch only takes the values
//!   the branch condition allows.
//! - An error raised by a nested function is reported at that function's
//!   argument and under its rule.
//! - A list element removed by `AWS::NoValue` shortens the list only in the
//!   scenario that removes it.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use stacklint_conditions::ConditionError;
use stacklint_core::{Region, Template};
use stacklint_engine::{
    Changes, CheckNode, Context, KeywordCheck, RegistryBuilder, ResolveError, Resolver, RuleMeta,
    ValidationError, Validator,
};

fn region(name: &str) -> Region {
    Region::new(name).expect("valid region")
}

fn context(template: Value, name: &str) -> Context {
    let template = Template::from_value(template).expect("template parses");
    Context::for_region(Arc::new(template), region(name))
}

#[test]
fn region_equality_is_fixed_by_region() {
    let template = json!({
        "Conditions": {"IsEast": {"Fn::Equals": [{"Ref": "AWS::Region"}, "us-east-1"]}}
    });

    let east = context(template.clone(), "us-east-1");
    assert!(east.conditions().implies("IsEast").unwrap());
    assert!(east.evolve(Changes::new().condition("IsEast", true)).is_ok());

    let west = context(template, "us-west-2");
    assert!(!west.conditions().is_satisfiable("IsEast", true).unwrap());
    assert!(matches!(
        west.evolve(Changes::new().condition("IsEast", true)),
        Err(ConditionError::Unsatisfiable { .. })
    ));
}

#[test]
fn if_on_fixed_condition_has_one_candidate() {
    let ctx = context(
        json!({"Conditions": {"Cond": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}}}),
        "us-east-1",
    )
    .evolve(Changes::new().condition("Cond", true))
    .unwrap();
    let resolver = Resolver::new(25);
    let candidates = resolver
        .resolve(&ctx, &json!({"Fn::If": ["Cond", "A", "B"]}))
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].value, json!("A"));
}

#[test]
fn identically_defined_conditions_cannot_disagree() {
    let ctx = context(
        json!({
            "Parameters": {"Env": {"Type": "String"}},
            "Conditions": {
                "IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
                "ProdStack": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}
            }
        }),
        "us-east-1",
    );
    assert!(ctx.conditions().set().equivalent("IsProd", "ProdStack").unwrap());
    let err = ctx
        .evolve(Changes::new().condition("IsProd", true).condition("ProdStack", false))
        .unwrap_err();
    assert!(matches!(err, ConditionError::Unsatisfiable { .. }));

    let prod = ctx.evolve(Changes::new().condition("IsProd", true)).unwrap();
    assert!(prod.evolve(Changes::new().condition("ProdStack", false)).is_err());
}

#[test]
fn join_over_region_and_if_yields_both_branches() {
    let ctx = context(
        json!({"Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}}}),
        "eu-central-1",
    );
    let resolver = Resolver::new(25);
    let mut values: Vec<Value> = resolver
        .resolve(
            &ctx,
            &json!({"Fn::Join": ["-", [{"Ref": "AWS::Region"}, {"Fn::If": ["IsProd", "prod", "dev"]}]]}),
        )
        .unwrap()
        .into_iter()
        .map(|c| c.value)
        .collect();
    values.sort_by_key(|v| v.to_string());
    assert_eq!(values, vec![json!("eu-central-1-dev"), json!("eu-central-1-prod")]);
}

/// Records every `Fn::GetAtt` it sees.
struct SeenGetAtt(Mutex<usize>);

impl KeywordCheck for SeenGetAtt {
    fn validate(
        &self,
        _: &Validator<'_>,
        _: &CheckNode,
        _: &Value,
        _: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        *self.0.lock() += 1;
        Vec::new()
    }
}

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
        match keyword_value.as_array() {
            Some(allowed) if !allowed.contains(instance) => {
                vec![v.error(format!("{instance} is not one of {keyword_value}"))]
            }
            _ => Vec::new(),
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
        let (Some(schemas), Some(object)) = (keyword_value.as_object(), instance.as_object()) else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        for (key, value) in object {
            if let Some(schema) = schemas.get(key) {
                errors.extend(v.descend_into_property(value, schema, key));
            }
        }
        errors
    }
}

#[test]
fn unpredictable_get_att_keeps_sibling_checks() {
    let seen = Arc::new(SeenGetAtt(Mutex::new(0)));
    let registry = RegistryBuilder::new()
        .register("enum", RuleMeta::new("E3030", "enum").unwrap(), Arc::new(Enum))
        .register("properties", RuleMeta::new("E3012", "properties").unwrap(), Arc::new(Properties))
        .register("fn_getatt", RuleMeta::new("E1999", "getatt").unwrap(), seen.clone())
        .build()
        .unwrap();
    let resolver = Resolver::new(25);
    let ctx = context(json!({"Resources": {"Topic": {"Type": "AWS::SNS::Topic"}}}), "us-east-1");

    let direct = resolver.resolve(&ctx, &json!({"Fn::GetAtt": ["Topic", "TopicName"]}));
    assert!(matches!(direct, Err(ResolveError::Unpredictable { .. })));

    let schema = json!({"properties": {
        "Name": {"enum": ["a"]},
        "Mode": {"enum": ["fast", "slow"]}
    }});
    let instance = json!({
        "Name": {"Fn::GetAtt": ["Topic", "TopicName"]},
        "Mode": "medium"
    });
    let errors = Validator::new(ctx, &registry, &resolver, &schema).validate(&instance, &schema);

    assert_eq!(*seen.0.lock(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E3030"));
    assert_eq!(stacklint_core::path::render(&errors[0].path), "Mode");
}

fn enum_registry() -> stacklint_engine::Registry {
    RegistryBuilder::new()
        .register("enum", RuleMeta::new("E3030", "enum").unwrap(), Arc::new(Enum))
        .register("properties", RuleMeta::new("E3012", "properties").unwrap(), Arc::new(Properties))
        .build()
        .unwrap()
}

fn env_template() -> Value {
    json!({
        "Parameters": {"Env": {"Type": "String", "AllowedValues": ["dev", "prod"]}},
        "Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}}
    })
}

#[test]
fn parameter_in_if_branch_respects_branch_condition() {
    let registry = enum_registry();
    let resolver = Resolver::new(25);
    let ctx = context(env_template(), "us-east-1");
    let schema = json!({"properties": {"Tier": {"enum": ["prod", "none"]}}});
    let instance = json!({"Tier": {"Fn::If": ["IsProd", {"Ref": "Env"}, "none"]}});
    let errors = Validator::new(ctx, &registry, &resolver, &schema).validate(&instance, &schema);
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn nested_function_error_points_at_inner_function() {
    let registry = enum_registry();
    let resolver = Resolver::new(25);
    let ctx = context(env_template(), "us-east-1");
    let schema = json!({"properties": {"Name": {"enum": ["x"]}}});
    let instance = json!({"Name": {"Fn::Join": ["-", ["x", {"Fn::Select": [5, ["a"]]}]]}});
    let errors = Validator::new(ctx, &registry, &resolver, &schema).validate(&instance, &schema);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E1017"));
    assert_eq!(
        stacklint_core::path::render(&errors[0].path),
        "Name/Fn::Join/1/1/Fn::Select/0"
    );
}

#[test]
fn removed_list_element_is_scenario_specific() {
    let ctx = context(env_template(), "us-east-1");
    let resolver = Resolver::new(25);
    let list = json!(["a", {"Fn::If": ["IsProd", "b", {"Ref": "AWS::NoValue"}]}]);

    let joined = resolver
        .resolve(&ctx, &json!({"Fn::Join": ["-", list.clone()]}))
        .unwrap();
    let pairs: Vec<(Value, Option<bool>)> = joined
        .into_iter()
        .map(|c| (c.value, c.assumptions.get("IsProd").copied()))
        .collect();
    assert_eq!(
        pairs,
        vec![(json!("a-b"), Some(true)), (json!("a"), Some(false))]
    );

    let registry = enum_registry();
    let schema = json!({"properties": {"Pick": {"enum": ["a", "b"]}}});
    let instance = json!({"Pick": {"Fn::Select": [1, list]}});
    let errors = Validator::new(ctx, &registry, &resolver, &schema).validate(&instance, &schema);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].rule.as_ref().map(RuleMeta::id), Some("E1017"));
    assert!(errors[0].message.contains("'IsProd' is false"), "{}", errors[0].message);
}
