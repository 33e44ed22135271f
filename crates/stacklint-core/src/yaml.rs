//! # Document Loading
//!
//! Parses template text into a `serde_json::Value` tree. JSON is parsed
//! directly; YAML is parsed with `serde_yaml` and converted, expanding the
//! short-form intrinsic tags (`!Ref`, `!Sub`, `!GetAtt`, ...) into their
//! long-form mapping equivalents so the rest of the workspace only ever
//! sees one representation.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{CoreError, TemplateError};

/// Short-form tags that expand to `{"Fn::<Name>": value}`.
const FN_TAGS: &[&str] = &[
    "And",
    "Base64",
    "Cidr",
    "Equals",
    "FindInMap",
    "GetAZs",
    "If",
    "ImportValue",
    "Join",
    "Length",
    "Not",
    "Or",
    "Select",
    "Split",
    "Sub",
    "ToJsonString",
    "Transform",
];

/// Load a template document from disk, choosing the parser by extension.
///
/// `.json` files are parsed as JSON; everything else as YAML (which also
/// accepts JSON text).
///
/// # Errors
///
/// Returns [`CoreError::Io`] if the file cannot be read and
/// [`CoreError::Template`] if it cannot be parsed.
pub fn load_document(path: &Path) -> Result<Value, CoreError> {
    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let value = match ext {
        "json" => parse_json(&content)?,
        _ => parse_yaml(&content)?,
    };
    Ok(value)
}

/// Parse JSON template text.
pub fn parse_json(text: &str) -> Result<Value, TemplateError> {
    serde_json::from_str(text).map_err(|e| TemplateError::Json {
        line: e.line(),
        column: e.column(),
        reason: e.to_string(),
    })
}

/// Parse YAML template text, expanding short-form intrinsic tags.
pub fn parse_yaml(text: &str) -> Result<Value, TemplateError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| TemplateError::Yaml(e.to_string()))?;
    yaml_to_json_value(&yaml)
}

fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, TemplateError> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| TemplateError::Yaml(format!("cannot represent float {f} in JSON")))
            } else {
                Err(TemplateError::Yaml(format!("unsupported YAML number: {n:?}")))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, TemplateError> =
                seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(TemplateError::Yaml(format!(
                            "unsupported YAML map key type: {other:?}"
                        )))
                    }
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let inner = yaml_to_json_value(&tagged.value)?;
            expand_tag(name, inner)
        }
    }
}

/// Expand one short-form tag into its long-form mapping.
fn expand_tag(name: &str, inner: Value) -> Result<Value, TemplateError> {
    let wrap = |key: &str, value: Value| {
        let mut m = Map::new();
        m.insert(key.to_string(), value);
        Value::Object(m)
    };
    match name {
        "Ref" | "Condition" => Ok(wrap(name, inner)),
        "GetAtt" => match inner {
            Value::String(s) => match s.split_once('.') {
                Some((resource, attribute)) => Ok(wrap(
                    "Fn::GetAtt",
                    Value::Array(vec![resource.into(), attribute.into()]),
                )),
                None => Err(TemplateError::Tag {
                    tag: "!GetAtt".to_string(),
                    reason: format!("expected Resource.Attribute, found {s:?}"),
                }),
            },
            other => Ok(wrap("Fn::GetAtt", other)),
        },
        n if FN_TAGS.contains(&n) => Ok(wrap(&format!("Fn::{n}"), inner)),
        other => Err(TemplateError::Tag {
            tag: format!("!{other}"),
            reason: "not an intrinsic function tag".to_string(),
        }),
    }
}
