//! Scalar and list constraints: `enum`, `const`, `pattern`, `minLength`,
//! `maxLength`, `minimum`, `maximum`, `minItems`, `maxItems`, `uniqueItems`.
//!
//! Comparisons follow the loose typing of [`crate::types`]: unless strict
//! typing is on, `enum` and `const` compare scalars by their string form and
//! numeric bounds accept numeric strings.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;
use serde_json::{Map, Value};

use stacklint_conditions::equals::scalar_string;
use stacklint_engine::{contains_function, CheckNode, KeywordCheck, ValidationError, Validator};

use crate::types::as_number;

fn loosely_equal(a: &Value, b: &Value, strict: bool) -> bool {
    if a == b {
        return true;
    }
    if strict {
        return false;
    }
    match (scalar_string(a), scalar_string(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// `enum`.
#[derive(Debug, Default)]
pub struct Enum;

impl KeywordCheck for Enum {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let Some(allowed) = keyword_value.as_array() else {
            return Vec::new();
        };
        let strict = v.context().strict_types();
        if allowed.iter().any(|a| loosely_equal(instance, a, strict)) {
            return Vec::new();
        }
        vec![v.error(format!("{instance} is not one of {keyword_value}"))]
    }
}

/// `const`.
#[derive(Debug, Default)]
pub struct Const;

impl KeywordCheck for Const {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        if loosely_equal(instance, keyword_value, v.context().strict_types()) {
            return Vec::new();
        }
        vec![v.error(format!("{instance} was expected to be {keyword_value}"))]
    }
}

/// `pattern`. Compiled expressions are memoized per check; a pattern the
/// regex engine rejects is logged once and never matched.
#[derive(Debug, Default)]
pub struct Pattern {
    compiled: Mutex<HashMap<String, Option<Regex>>>,
}

impl Pattern {
    pub(crate) fn regex(&self, pattern: &str) -> Option<Regex> {
        let mut compiled = self.compiled.lock();
        compiled
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "schema pattern is not supported");
                    None
                }
            })
            .clone()
    }
}

impl KeywordCheck for Pattern {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let (Some(pattern), Some(text)) = (keyword_value.as_str(), instance.as_str()) else {
            return Vec::new();
        };
        match self.regex(pattern) {
            Some(re) if !re.is_match(text) => vec![v.error(format!("{instance} does not match '{pattern}'"))],
            _ => Vec::new(),
        }
    }
}

// ── Bounds ───────────────────────────────────────────────────────────

fn bound(keyword_value: &Value) -> Option<u64> {
    keyword_value
        .as_u64()
        .or_else(|| keyword_value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// `minLength`, counted in characters.
#[derive(Debug, Default)]
pub struct MinLength;

impl KeywordCheck for MinLength {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        match (bound(keyword_value), instance.as_str()) {
            (Some(min), Some(s)) if (s.chars().count() as u64) < min => {
                vec![v.error(format!("{instance} is shorter than {min}"))]
            }
            _ => Vec::new(),
        }
    }
}

/// `maxLength`, counted in characters.
#[derive(Debug, Default)]
pub struct MaxLength;

impl KeywordCheck for MaxLength {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        match (bound(keyword_value), instance.as_str()) {
            (Some(max), Some(s)) if (s.chars().count() as u64) > max => {
                vec![v.error(format!("{instance} is longer than {max}"))]
            }
            _ => Vec::new(),
        }
    }
}

/// `minimum`.
#[derive(Debug, Default)]
pub struct Minimum;

impl KeywordCheck for Minimum {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let strict = v.context().strict_types();
        match (keyword_value.as_f64(), as_number(instance, strict)) {
            (Some(min), Some(n)) if n < min => {
                vec![v.error(format!("{instance} is less than the minimum of {keyword_value}"))]
            }
            _ => Vec::new(),
        }
    }
}

/// `maximum`.
#[derive(Debug, Default)]
pub struct Maximum;

impl KeywordCheck for Maximum {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let strict = v.context().strict_types();
        match (keyword_value.as_f64(), as_number(instance, strict)) {
            (Some(max), Some(n)) if n > max => {
                vec![v.error(format!("{instance} is greater than the maximum of {keyword_value}"))]
            }
            _ => Vec::new(),
        }
    }
}

/// `minItems`.
#[derive(Debug, Default)]
pub struct MinItems;

impl KeywordCheck for MinItems {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        match (bound(keyword_value), instance.as_array()) {
            (Some(min), Some(items)) if (items.len() as u64) < min => vec![v.error(format!(
                "expected minimum item count: {min}, found: {}",
                items.len()
            ))],
            _ => Vec::new(),
        }
    }
}

/// `maxItems`.
#[derive(Debug, Default)]
pub struct MaxItems;

impl KeywordCheck for MaxItems {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        match (bound(keyword_value), instance.as_array()) {
            (Some(max), Some(items)) if (items.len() as u64) > max => vec![v.error(format!(
                "expected maximum item count: {max}, found: {}",
                items.len()
            ))],
            _ => Vec::new(),
        }
    }
}

/// `uniqueItems`. Items that still contain functions are not compared;
/// two identical expressions can yield different values.
#[derive(Debug, Default)]
pub struct UniqueItems;

impl KeywordCheck for UniqueItems {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let (Some(true), Some(items)) = (keyword_value.as_bool(), instance.as_array()) else {
            return Vec::new();
        };
        let literal: Vec<&Value> = items.iter().filter(|i| !contains_function(i)).collect();
        for (i, item) in literal.iter().enumerate() {
            if literal[i + 1..].contains(item) {
                return vec![v.error(format!("{instance} has non-unique elements"))];
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stacklint_engine::Changes;

    use crate::testing::{ids, run, run_with};

    #[test]
    fn test_enum_compares_loosely() {
        assert!(run(json!(1), json!({"enum": ["1", "2"]})).is_empty());
        assert!(run(json!("true"), json!({"enum": [true]})).is_empty());
        let errors = run(json!("3"), json!({"enum": ["1", "2"]}));
        assert_eq!(ids(&errors), vec!["E3030"]);
        assert_eq!(errors[0].message, "\"3\" is not one of [\"1\",\"2\"]");
        let strict = run_with(json!(1), json!({"enum": ["1"]}), Changes::new().strict_types(true));
        assert_eq!(ids(&strict), vec!["E3030"]);
    }

    #[test]
    fn test_enum_over_parameter_candidates() {
        let errors = run(json!({"Ref": "Env"}), json!({"enum": ["prod", "test"]}));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "\"dev\" is not one of [\"prod\",\"test\"] when 'Ref' is resolved"
        );
    }

    #[test]
    fn test_const() {
        assert!(run(json!("Enabled"), json!({"const": "Enabled"})).is_empty());
        assert_eq!(ids(&run(json!("Suspended"), json!({"const": "Enabled"}))), vec!["E3039"]);
    }

    #[test]
    fn test_pattern() {
        let schema = json!({"pattern": "^[a-z0-9.-]+$"});
        assert!(run(json!("my-bucket"), schema.clone()).is_empty());
        let errors = run(json!("My_Bucket"), schema.clone());
        assert_eq!(ids(&errors), vec!["E3031"]);
        assert!(errors[0].message.contains("does not match"));
        // Non-strings and unsupported expressions are not checked.
        assert!(run(json!(5), schema).is_empty());
        assert!(run(json!("x"), json!({"pattern": "(?<=a)b"})).is_empty());
    }

    #[test]
    fn test_pattern_cache() {
        let check = Pattern::default();
        assert!(check.regex("^a$").is_some());
        assert!(check.regex("^a$").is_some());
        assert!(check.regex("(").is_none());
        assert_eq!(check.compiled.lock().len(), 2);
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(ids(&run(json!("ab"), json!({"minLength": 3}))), vec!["E3033"]);
        assert_eq!(ids(&run(json!("abcd"), json!({"maxLength": 3}))), vec!["E3036"]);
        assert!(run(json!("äöü"), json!({"maxLength": 3})).is_empty());
    }

    #[test]
    fn test_numeric_bounds() {
        assert_eq!(ids(&run(json!(0), json!({"minimum": 1}))), vec!["E3034"]);
        assert_eq!(ids(&run(json!("901"), json!({"maximum": 900}))), vec!["E3038"]);
        assert!(run(json!("abc"), json!({"maximum": 900})).is_empty());
        let errors = run(json!(1000), json!({"maximum": 900}));
        assert_eq!(errors[0].message, "1000 is greater than the maximum of 900");
    }

    #[test]
    fn test_item_counts() {
        let errors = run(json!([]), json!({"minItems": 1}));
        assert_eq!(ids(&errors), vec!["E3032"]);
        assert_eq!(errors[0].message, "expected minimum item count: 1, found: 0");
        assert_eq!(ids(&run(json!([1, 2, 3]), json!({"maxItems": 2}))), vec!["E3035"]);
    }

    #[test]
    fn test_unique_items() {
        assert_eq!(ids(&run(json!(["a", "a"]), json!({"uniqueItems": true}))), vec!["E3037"]);
        assert!(run(json!(["a", "a"]), json!({"uniqueItems": false})).is_empty());
        assert!(run(
            json!([{"Ref": "AWS::Region"}, {"Ref": "AWS::Region"}]),
            json!({"uniqueItems": true})
        )
        .is_empty());
    }
}
