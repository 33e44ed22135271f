//! `allOf`, `anyOf`, `oneOf` and `not`.
//!
//! Sub-schemas are evaluated under the same context; their own errors are
//! only surfaced by `allOf`.

use serde_json::{Map, Value};

use stacklint_engine::{CheckNode, KeywordCheck, ValidationError, Validator};

fn alternatives(keyword_value: &Value) -> &[Value] {
    keyword_value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// `allOf`.
#[derive(Debug, Default)]
pub struct AllOf;

impl KeywordCheck for AllOf {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        alternatives(keyword_value)
            .iter()
            .flat_map(|schema| v.validate(instance, schema))
            .collect()
    }
}

/// `anyOf`.
#[derive(Debug, Default)]
pub struct AnyOf;

impl KeywordCheck for AnyOf {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let schemas = alternatives(keyword_value);
        if schemas.is_empty() || schemas.iter().any(|s| v.is_valid(instance, s)) {
            return Vec::new();
        }
        vec![v.error(format!("{instance} is not valid under any of the given schemas"))]
    }
}

/// `oneOf`.
#[derive(Debug, Default)]
pub struct OneOf;

impl KeywordCheck for OneOf {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let schemas = alternatives(keyword_value);
        if schemas.is_empty() {
            return Vec::new();
        }
        match schemas.iter().filter(|s| v.is_valid(instance, s)).count() {
            1 => Vec::new(),
            0 => vec![v.error(format!("{instance} is not valid under any of the given schemas"))],
            _ => vec![v.error(format!("{instance} is valid under more than one of the given schemas"))],
        }
    }
}

/// `not`.
#[derive(Debug, Default)]
pub struct Not;

impl KeywordCheck for Not {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        if v.is_valid(instance, keyword_value) {
            vec![v.error(format!("{instance} should not be valid under {keyword_value}"))]
        } else {
            Vec::new()
        }
    }
}
