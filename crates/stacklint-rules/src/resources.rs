//! # Resource-Level Checks
//!
//! Provider schemas carry markers that are not JSON Schema keywords:
//!
//! - `readOnlyProperties` at the schema root lists properties the service
//!   sets; a template must not.
//! - `cfnLint` on a property names template-specific checks to run there.
//!   The [`CfnLint`] parent owns those checks as registry children and
//!   dispatches by name.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use stacklint_engine::{is_no_value, CheckNode, Context, KeywordCheck, ValidationError, Validator};
use stacklint_schema::pointer_to_path;

/// `readOnlyProperties`.
#[derive(Debug, Default)]
pub struct ReadOnlyProperties;

/// Every position in `instance` addressed by `path`, where `*` matches each
/// list item.
fn locate(ctx: &Context, instance: &Value, path: &[String], found: &mut Vec<Context>) {
    let Some((head, rest)) = path.split_first() else {
        found.push(ctx.clone());
        return;
    };
    match (head.as_str(), instance) {
        ("*", Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                locate(&ctx.child(i), item, rest, found);
            }
        }
        (key, Value::Object(object)) => {
            if let Some(value) = object.get(key).filter(|v| !is_no_value(v)) {
                locate(&ctx.child(key), value, rest, found);
            }
        }
        _ => {}
    }
}

impl KeywordCheck for ReadOnlyProperties {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        if !v.context().path().cfn_path().is_empty() {
            return Vec::new();
        }
        let mut errors = Vec::new();
        for path in keyword_value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter_map(pointer_to_path)
        {
            let mut found = Vec::new();
            locate(v.context(), instance, &path, &mut found);
            for ctx in found {
                errors.push(ValidationError::new(
                    &ctx,
                    format!("Read only property '{}' cannot be set", path.join("/")),
                ));
            }
        }
        errors
    }
}

/// `cfnLint`: runs the child checks named in the keyword's list.
#[derive(Debug, Default)]
pub struct CfnLint;

impl KeywordCheck for CfnLint {
    fn validate(
        &self,
        v: &Validator<'_>,
        node: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        schema: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        keyword_value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .flat_map(|name| v.run_children(node, name, keyword_value, instance, schema))
            .collect()
    }
}

fn zone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2}(-gov|-iso|-isob)?-[a-z]+-\d+[a-z]$")
            .expect("BUG: hardcoded availability zone pattern rejected by regex")
    })
}

/// Child of `cfnLint` under `AvailabilityZone`: warns about literal zone
/// names. Values produced by functions (`Fn::GetAZs`, parameters) pass.
#[derive(Debug, Default)]
pub struct HardcodedAvailabilityZone;

impl HardcodedAvailabilityZone {
    fn check(v: &Validator<'_>, zone: &str) -> Option<ValidationError> {
        zone_pattern()
            .is_match(zone)
            .then(|| v.error(format!("Avoid hardcoding availability zone '{zone}'")))
    }
}

impl KeywordCheck for HardcodedAvailabilityZone {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        _: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        if v.context().resolved_value() {
            return Vec::new();
        }
        match instance {
            Value::String(zone) => Self::check(v, zone).into_iter().collect(),
            Value::Array(zones) => zones
                .iter()
                .enumerate()
                .filter_map(|(i, z)| Some((i, z.as_str()?)))
                .filter_map(|(i, zone)| Self::check(&v.with_context(v.context().child(i)), zone))
                .collect(),
            _ => Vec::new(),
        }
    }
}
