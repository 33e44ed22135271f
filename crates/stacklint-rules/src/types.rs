//! # Type Check
//!
//! Template values are loosely typed: the service accepts `"3"` where a
//! number is expected and `true` where a string is. Unless strict typing is
//! on, a scalar passes `type` when it converts losslessly to the expected
//! type. Containers never convert.

use serde_json::{Map, Value};

use stacklint_engine::{CheckNode, KeywordCheck, ValidationError, Validator};

/// `type`.
#[derive(Debug, Default)]
pub struct Type;

/// Whether `instance` is acceptable as `expected`.
pub fn is_type(instance: &Value, expected: &str, strict: bool) -> bool {
    match (expected, instance) {
        ("object", Value::Object(_))
        | ("array", Value::Array(_))
        | ("null", Value::Null)
        | ("string", Value::String(_))
        | ("boolean", Value::Bool(_))
        | ("number", Value::Number(_)) => true,
        ("integer", Value::Number(n)) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ if strict => false,
        ("string", Value::Number(_) | Value::Bool(_)) => true,
        ("integer", Value::String(s)) => s.trim().parse::<i64>().is_ok(),
        ("number", Value::String(s)) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        ("boolean", Value::String(s)) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

/// The numeric value of `instance`, converting strings unless `strict`.
pub fn as_number(instance: &Value, strict: bool) -> Option<f64> {
    match instance {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !strict => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

impl KeywordCheck for Type {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let expected: Vec<&str> = match keyword_value {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => return Vec::new(),
        };
        let strict = v.context().strict_types();
        if expected.is_empty() || expected.iter().any(|t| is_type(instance, t, strict)) {
            return Vec::new();
        }
        let names = expected.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>().join(", ");
        vec![v.error(format!("{instance} is not of type {names}"))]
    }
}
