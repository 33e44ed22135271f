//! Checks registered under function keywords. They see the raw function
//! arguments before resolution, so they run even when the value itself is
//! unpredictable.

use serde_json::{Map, Value};

use stacklint_core::PathSegment;
use stacklint_engine::resolver::sub_variables;
use stacklint_engine::{CheckNode, Function, KeywordCheck, ValidationError, Validator};

fn error_at(v: &Validator<'_>, function: Function, index: Option<usize>, message: String) -> ValidationError {
    let mut e = v.error(message);
    e.path.push(PathSegment::from(function.name()));
    if let Some(i) = index {
        e.path.push(PathSegment::Index(i));
    }
    e
}

/// `Fn::GetAtt` names a declared resource and, where the resource type's
/// schema is known, one of its attributes.
#[derive(Debug, Default)]
pub struct GetAttTarget;

impl KeywordCheck for GetAttTarget {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        _: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let (resource, attribute, listed) = match keyword_value {
            Value::Array(args) if args.len() == 2 => match &args[0] {
                Value::String(resource) => (resource.as_str(), args[1].as_str(), true),
                _ => return Vec::new(),
            },
            Value::String(dotted) => match dotted.split_once('.') {
                Some((resource, attribute)) => (resource, Some(attribute), false),
                None => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        let Some(declared) = v.context().template().resource(resource) else {
            return vec![error_at(
                v,
                Function::GetAtt,
                listed.then_some(0),
                format!("'{resource}' is not a resource in the template"),
            )];
        };
        let (Some(attribute), Some(store), Some(region)) = (attribute, v.store(), v.region()) else {
            return Vec::new();
        };
        let Some(schema) = store.resource_schema(&declared.type_name, region) else {
            return Vec::new();
        };
        let attributes = schema.attributes();
        if attributes.is_empty() || attributes.contains(attribute) {
            return Vec::new();
        }
        vec![error_at(
            v,
            Function::GetAtt,
            listed.then_some(1),
            format!(
                "'{attribute}' is not one of {:?} for resource type '{}'",
                attributes.iter().collect::<Vec<_>>(),
                declared.type_name
            ),
        )]
    }
}

/// `Ref` to a resource that only exists under a condition the current
/// position does not imply.
#[derive(Debug, Default)]
pub struct ConditionalRef;

impl KeywordCheck for ConditionalRef {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        _: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let Some(name) = keyword_value.as_str() else {
            return Vec::new();
        };
        let Some(condition) = v
            .context()
            .template()
            .resource(name)
            .and_then(|r| r.condition.as_deref())
        else {
            return Vec::new();
        };
        match v.context().conditions().implies(condition) {
            Ok(false) => vec![error_at(
                v,
                Function::Ref,
                None,
                format!("'{name}' may not exist: its condition '{condition}' is not always true here"),
            )],
            Ok(true) => Vec::new(),
            Err(e) => {
                tracing::trace!(resource = %name, error = %e, "conditional ref not checked");
                Vec::new()
            }
        }
    }
}

/// `Fn::Sub` on a string without variables.
#[derive(Debug, Default)]
pub struct SubWithoutVariables;

impl KeywordCheck for SubWithoutVariables {
    fn validate(
        &self,
        v: &Validator<'_>,
        _: &CheckNode,
        keyword_value: &Value,
        _: &Value,
        _: &Map<String, Value>,
    ) -> Vec<ValidationError> {
        let text = match keyword_value {
            Value::String(text) => text,
            Value::Array(args) => match args.first() {
                Some(Value::String(text)) => text,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        if !sub_variables(text).is_empty() {
            return Vec::new();
        }
        vec![error_at(
            v,
            Function::Sub,
            None,
            "Fn::Sub isn't needed because there are no variables".to_string(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stacklint_core::path::render;
    use stacklint_engine::Changes;

    use crate::testing::{ids, run, run_with};

    #[test]
    fn test_get_att_unknown_resource() {
        let errors = run(json!({"Fn::GetAtt": ["Missing", "Arn"]}), json!({"type": "string"}));
        assert_eq!(ids(&errors), vec!["E1010"]);
        assert_eq!(render(&errors[0].path), "Fn::GetAtt/0");

        let dotted = run(json!({"Fn::GetAtt": "Missing.Arn"}), json!({}));
        assert_eq!(render(&dotted[0].path), "Fn::GetAtt");
        assert!(run(json!({"Fn::GetAtt": ["Bucket", "Arn"]}), json!({})).is_empty());
    }

    #[test]
    fn test_ref_to_conditional_resource() {
        let schema = json!({"type": "string"});
        let errors = run(json!({"Ref": "ProdQueue"}), schema.clone());
        assert_eq!(ids(&errors), vec!["W1001"]);
        assert_eq!(render(&errors[0].path), "Ref");

        let guarded = run_with(json!({"Ref": "ProdQueue"}), schema.clone(), Changes::new().condition("IsProd", true));
        assert!(guarded.is_empty());
        assert!(run(json!({"Ref": "Bucket"}), schema).is_empty());
    }

    #[test]
    fn test_ref_inside_matching_if_branch() {
        let errors = run(
            json!({"Fn::If": ["IsProd", {"Ref": "ProdQueue"}, "none"]}),
            json!({"type": "string"}),
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_sub_without_variables() {
        let errors = run(json!({"Fn::Sub": "plain-text"}), json!({"type": "string"}));
        assert_eq!(ids(&errors), vec!["W1020"]);
        assert!(run(json!({"Fn::Sub": "${AWS::Region}-x"}), json!({"type": "string"})).is_empty());
        assert!(run(json!({"Fn::Sub": "$${!Literal}"}), json!({})).len() == 1);
    }
}
