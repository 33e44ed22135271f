//! # Template Model
//!
//! Read-only view of a parsed (and already transform-expanded) template:
//! declared parameters, resources, mappings and raw condition definitions.
//! Built once per document and shared behind an `Arc` by every validation
//! pass.
//!
//! Malformed entries are not fatal. They are skipped and recorded as
//! [`TemplateIssue`]s so the lint pass can report them next to the other
//! diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TemplateError;
use crate::path::PathSegment;

/// A structural problem found while building the template model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateIssue {
    /// Document path of the offending node.
    pub path: Vec<PathSegment>,
    /// Human-readable description.
    pub message: String,
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Logical name.
    pub name: String,
    /// Declared `Type`.
    pub type_name: String,
    /// `Default`, if declared.
    pub default: Option<Value>,
    /// `AllowedValues`, empty when not declared.
    pub allowed_values: Vec<Value>,
    /// `NoEcho` flag.
    pub no_echo: bool,
}

impl Parameter {
    /// Whether `Ref` to this parameter produces a list.
    pub fn is_list(&self) -> bool {
        self.type_name == "CommaDelimitedList"
            || self.type_name.starts_with("List<")
            || self.type_name.starts_with("AWS::SSM::Parameter::Value<List<")
            || self.type_name.starts_with("AWS::SSM::Parameter::Value<CommaDelimitedList")
    }

    /// Whether the parameter value is fetched from the parameter store at
    /// deployment time.
    pub fn is_ssm(&self) -> bool {
        self.type_name.starts_with("AWS::SSM::Parameter::Value")
    }
}

/// A declared template resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Logical name.
    pub name: String,
    /// Declared `Type`, e.g. `AWS::S3::Bucket`.
    pub type_name: String,
    /// Resource-level `Condition`, if any.
    pub condition: Option<String>,
    /// `Properties` block, if any.
    pub properties: Option<Value>,
    /// `DependsOn` targets.
    pub depends_on: Vec<String>,
}

/// Parsed template declarations.
#[derive(Debug, Clone, Default)]
pub struct Template {
    root: Value,
    parameters: BTreeMap<String, Parameter>,
    resources: BTreeMap<String, Resource>,
    mappings: Map<String, Value>,
    conditions: Map<String, Value>,
    transforms: Vec<String>,
    issues: Vec<TemplateIssue>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Template {
    /// Build the template model from a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotAnObject`] when the root is not a mapping.
    /// Every other structural problem is recorded as a [`TemplateIssue`].
    pub fn from_value(root: Value) -> Result<Self, TemplateError> {
        let Value::Object(top) = &root else {
            return Err(TemplateError::NotAnObject {
                found: type_name(&root),
            });
        };

        let mut issues = Vec::new();
        let section = |name: &str, issues: &mut Vec<TemplateIssue>| -> Map<String, Value> {
            match top.get(name) {
                None => Map::new(),
                Some(Value::Object(m)) => m.clone(),
                Some(other) => {
                    issues.push(TemplateIssue {
                        path: vec![PathSegment::from(name)],
                        message: format!("{name} must be an object, found {}", type_name(other)),
                    });
                    Map::new()
                }
            }
        };

        let parameters = section("Parameters", &mut issues)
            .into_iter()
            .filter_map(|(name, body)| match parse_parameter(&name, &body) {
                Ok(p) => Some((name, p)),
                Err(message) => {
                    issues.push(TemplateIssue {
                        path: vec!["Parameters".into(), name.into()],
                        message,
                    });
                    None
                }
            })
            .collect();

        let resources = section("Resources", &mut issues)
            .into_iter()
            .filter_map(|(name, body)| match parse_resource(&name, &body) {
                Ok(r) => Some((name, r)),
                Err(message) => {
                    issues.push(TemplateIssue {
                        path: vec!["Resources".into(), name.into()],
                        message,
                    });
                    None
                }
            })
            .collect();

        let mappings = section("Mappings", &mut issues);
        let conditions = section("Conditions", &mut issues);

        let transforms = match top.get("Transform") {
            None => Vec::new(),
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            Some(other) => {
                issues.push(TemplateIssue {
                    path: vec!["Transform".into()],
                    message: format!(
                        "Transform must be a string or list, found {}",
                        type_name(other)
                    ),
                });
                Vec::new()
            }
        };

        if !transforms.is_empty() {
            tracing::debug!(?transforms, "template declares transforms; validating as given");
        }

        Ok(Self {
            root,
            parameters,
            resources,
            mappings,
            conditions,
            transforms,
            issues,
        })
    }

    /// The whole document.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Declared parameters keyed by logical name.
    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    /// Look up a declared parameter.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Declared resources keyed by logical name.
    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    /// Look up a declared resource.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// The `Mappings` section.
    pub fn mappings(&self) -> &Map<String, Value> {
        &self.mappings
    }

    /// Raw `Conditions` definitions keyed by name.
    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    /// Declared transforms.
    pub fn transforms(&self) -> &[String] {
        &self.transforms
    }

    /// Structural problems found while building the model.
    pub fn issues(&self) -> &[TemplateIssue] {
        &self.issues
    }
}

fn parse_parameter(name: &str, body: &Value) -> Result<Parameter, String> {
    let Value::Object(body) = body else {
        return Err(format!("Parameter {name} must be an object"));
    };
    let type_name = body
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Parameter {name} is missing a string Type"))?
        .to_string();
    let allowed_values = match body.get("AllowedValues") {
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(format!("Parameter {name} AllowedValues must be a list")),
        None => Vec::new(),
    };
    let no_echo = match body.get("NoEcho") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    Ok(Parameter {
        name: name.to_string(),
        type_name,
        default: body.get("Default").cloned(),
        allowed_values,
        no_echo,
    })
}

fn parse_resource(name: &str, body: &Value) -> Result<Resource, String> {
    let Value::Object(body) = body else {
        return Err(format!("Resource {name} must be an object"));
    };
    let type_name = body
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Resource {name} is missing a string Type"))?
        .to_string();
    let condition = match body.get("Condition") {
        None => None,
        Some(Value::String(c)) => Some(c.clone()),
        Some(_) => return Err(format!("Resource {name} Condition must be a string")),
    };
    let depends_on = match body.get("DependsOn") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    };
    Ok(Resource {
        name: name.to_string(),
        type_name,
        condition,
        properties: body.get("Properties").cloned(),
        depends_on,
    })
}
