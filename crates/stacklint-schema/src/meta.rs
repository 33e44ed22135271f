//! # Provider Meta-Schema
//!
//! Every provider schema admitted to a store is first validated against a
//! JSON Schema describing the provider-schema format: a `typeName`, a
//! `properties` map, optional `definitions`, and property-pointer lists
//! (`readOnlyProperties`, `createOnlyProperties`, `primaryIdentifier`) whose
//! entries point under `/properties/`.
//!
//! The meta-schema is compiled once per [`MetaValidator`]; compiled
//! validators are `Send + Sync` and may be shared across threads.

use jsonschema::{Draft, Validator};
use serde_json::{json, Value};

use crate::error::SchemaStoreError;

fn provider_meta_schema() -> Value {
    let pointer_list = json!({
        "type": "array",
        "uniqueItems": true,
        "items": {"type": "string", "pattern": "^/properties/"}
    });
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["typeName", "properties"],
        "properties": {
            "typeName": {
                "type": "string",
                "pattern": "^[A-Za-z0-9]{2,64}::[A-Za-z0-9]{2,64}::[A-Za-z0-9]{2,64}$"
            },
            "description": {"type": "string"},
            "properties": {
                "type": "object",
                "minProperties": 1,
                "additionalProperties": {"type": ["object", "boolean"]}
            },
            "definitions": {
                "type": "object",
                "additionalProperties": {"type": ["object", "boolean"]}
            },
            "required": {
                "type": "array",
                "uniqueItems": true,
                "items": {"type": "string"}
            },
            "additionalProperties": {"type": "boolean"},
            "readOnlyProperties": pointer_list.clone(),
            "createOnlyProperties": pointer_list.clone(),
            "writeOnlyProperties": pointer_list.clone(),
            "primaryIdentifier": pointer_list,
        }
    })
}

/// Compiled provider meta-schema.
pub struct MetaValidator {
    validator: Validator,
}

impl std::fmt::Debug for MetaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaValidator").finish_non_exhaustive()
    }
}

impl MetaValidator {
    /// Compile the provider meta-schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaStoreError::MetaSchema`] if compilation fails.
    pub fn new() -> Result<Self, SchemaStoreError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&provider_meta_schema())
            .map_err(|e| SchemaStoreError::MetaSchema(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Check one provider schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaStoreError::Invalid`] listing every violation.
    pub fn check(&self, schema: &Value) -> Result<(), SchemaStoreError> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(schema)
            .map(|e| {
                let at = e.instance_path.to_string();
                if at.is_empty() {
                    format!("(root): {e}")
                } else {
                    format!("{at}: {e}")
                }
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            let type_name = schema
                .get("typeName")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();
            Err(SchemaStoreError::Invalid {
                type_name,
                violations,
            })
        }
    }
}
