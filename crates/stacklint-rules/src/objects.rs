//! Structural keywords: `properties`, `additionalProperties`,
//! `patternProperties`, `required`, `dependentRequired`, `items`.
//!
//! A property whose value is `Ref: AWS::NoValue` counts as absent.

use serde_json::{Map, Value};

use stacklint_engine::{is_no_value, CheckNode, KeywordCheck, ValidationError, Validator};

use crate::values::Pattern;

fn present<'v>(object: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    object.get(key).filter(|v| !is_no_value(v))
}

/// `properties`.
#[derive(Debug, Default)]
pub struct Properties;

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
        object
            .iter()
            .filter_map(|(key, value)| schemas.get(key).map(|schema| (key, value, schema)))
            .flat_map(|(key, value, schema)| v.descend_into_property(value, schema, key))
            .collect()
    }
}

/// `patternProperties`.
#[derive(Debug, Default)]
pub struct PatternProperties {
    patterns: Pattern,
}

impl KeywordCheck for PatternProperties {
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
        for (pattern, schema) in schemas {
            let Some(re) = self.patterns.regex(pattern) else {
                continue;
            };
            for (key, value) in object.iter().filter(|(k, _)| re.is_match(k)) {
                errors.extend(v.descend_into_property(value, schema, key));
            }
        }
        errors
    }
}

/// `additionalProperties`: keys matched by neither `properties` nor
/// `patternProperties` of the same schema.
#[derive(Debug, Default)]
pub struct AdditionalProperties {
    patterns: Pattern,
}

impl AdditionalProperties {
    fn is_declared(&self, key: &str, schema: &Map<String, Value>) -> bool {
        if schema
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|p| p.contains_key(key))
        {
            return true;
        }
        schema
            .get("patternProperties")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|p| p.keys())
            .filter_map(|pattern| self.patterns.regex(pattern))
            .any(|re| re.is_match(key))
    }
}

impl KeywordCheck for AdditionalProperties {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        schema: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let Some(object) = instance.as_object() else {
            return Vec::new();
        };
        let extras = object.iter().filter(|(key, _)| !self.is_declared(key, schema));
        match keyword_value {
            Value::Bool(false) => extras
                .map(|(key, _)| {
                    v.with_context(v.context().child(key.as_str()))
                        .error(format!("Additional properties are not allowed ('{key}' was unexpected)"))
                })
                .collect(),
            Value::Object(_) => extras
                .flat_map(|(key, value)| v.descend_into_property(value, keyword_value, key))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// `required`.
#[derive(Debug, Default)]
pub struct Required;

impl KeywordCheck for Required {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let (Some(names), Some(object)) = (keyword_value.as_array(), instance.as_object()) else {
            return Vec::new();
        };
        names
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| present(object, name).is_none())
            .map(|name| v.error(format!("'{name}' is a required property")))
            .collect()
    }
}

/// `dependentRequired`.
#[derive(Debug, Default)]
pub struct DependentRequired;

impl KeywordCheck for DependentRequired {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let (Some(dependencies), Some(object)) = (keyword_value.as_object(), instance.as_object()) else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        for (property, needs) in dependencies {
            if present(object, property).is_none() {
                continue;
            }
            for need in needs.as_array().into_iter().flatten().filter_map(Value::as_str) {
                if present(object, need).is_none() {
                    errors.push(v.error(format!("'{need}' is a dependency of '{property}'")));
                }
            }
        }
        errors
    }
}

/// `items`, as a single schema or a positional list.
#[derive(Debug, Default)]
pub struct Items;

impl KeywordCheck for Items {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        instance: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let Some(items) = instance.as_array() else {
            return Vec::new();
        };
        match keyword_value {
            Value::Array(schemas) => items
                .iter()
                .zip(schemas)
                .enumerate()
                .flat_map(|(i, (item, schema))| v.descend_into_item(item, schema, i))
                .collect(),
            schema => items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| v.descend_into_item(item, schema, i))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stacklint_core::path::render;

    use crate::testing::{ids, run};

    #[test]
    fn test_nested_paths() {
        let schema = json!({
            "properties": {"Tags": {"items": {"properties": {"Key": {"type": "string"}}}}}
        });
        let errors = run(json!({"Tags": [{"Key": "a"}, {"Key": ["b"]}]}), schema);
        assert_eq!(ids(&errors), vec!["E3012"]);
        assert_eq!(render(&errors[0].path), "Tags/1/Key");
        assert_eq!(errors[0].schema_path, vec!["Tags", "*", "Key"]);
    }

    #[test]
    fn test_additional_properties() {
        let schema = json!({
            "additionalProperties": false,
            "properties": {"Name": {}},
            "patternProperties": {"^x-": {}}
        });
        assert!(run(json!({"Name": "a", "x-extra": 1}), schema.clone()).is_empty());
        let errors = run(json!({"Name": "a", "Nmae": "b"}), schema);
        assert_eq!(ids(&errors), vec!["E3002"]);
        assert_eq!(render(&errors[0].path), "Nmae");
        assert_eq!(errors[0].message, "Additional properties are not allowed ('Nmae' was unexpected)");

        let typed = run(json!({"a": 1, "b": "x"}), json!({"additionalProperties": {"type": "string"}}));
        assert_eq!(ids(&typed), vec!["E3012"]);
    }

    #[test]
    fn test_pattern_properties() {
        let errors = run(
            json!({"Port80": "x", "Other": "y"}),
            json!({"patternProperties": {"^Port\\d+$": {"type": "integer"}}}),
        );
        assert_eq!(ids(&errors), vec!["E3012"]);
        assert_eq!(render(&errors[0].path), "Port80");
    }

    #[test]
    fn test_required_and_no_value() {
        let schema = json!({"required": ["VpcId"]});
        assert!(run(json!({"VpcId": "vpc-1"}), schema.clone()).is_empty());
        assert_eq!(ids(&run(json!({}), schema.clone())), vec!["E3003"]);
        let errors = run(json!({"VpcId": {"Ref": "AWS::NoValue"}}), schema);
        assert_eq!(errors[0].message, "'VpcId' is a required property");
    }

    #[test]
    fn test_dependent_required() {
        let schema = json!({"dependentRequired": {"ContentBasedDeduplication": ["FifoQueue"]}});
        assert!(run(json!({"FifoQueue": true}), schema.clone()).is_empty());
        let errors = run(json!({"ContentBasedDeduplication": true}), schema);
        assert_eq!(ids(&errors), vec!["E3021"]);
        assert_eq!(errors[0].message, "'FifoQueue' is a dependency of 'ContentBasedDeduplication'");
    }

    #[test]
    fn test_positional_items() {
        let errors = run(json!(["a", "b"]), json!({"items": [{"type": "string"}, {"type": "object"}]}));
        assert_eq!(ids(&errors), vec!["E3012"]);
        assert_eq!(render(&errors[0].path), "1");
    }
}
