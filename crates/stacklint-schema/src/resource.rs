//! # Resource Schemas
//!
//! A [`ResourceSchema`] wraps one provider schema document. The document is
//! itself a JSON Schema for the resource's `Properties` object (with
//! `definitions` reachable through `$ref: "#/definitions/..."`), plus
//! property-pointer lists the validator consumes as markers.
//!
//! Pointers such as `/properties/Tags/*/Key` are stored as schema paths
//! (`["Tags", "*", "Key"]`), the same shape as a document path's
//! `cfn_path`, so checks can compare them directly.

use std::collections::BTreeSet;

use serde_json::Value;

/// A provider schema for one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    type_name: String,
    schema: Value,
    read_only: BTreeSet<Vec<String>>,
    create_only: BTreeSet<Vec<String>>,
}

fn pointers(schema: &Value, key: &str) -> BTreeSet<Vec<String>> {
    schema
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter_map(pointer_to_path)
        .collect()
}

/// Convert `/properties/A/B` to `["A", "B"]`.
pub fn pointer_to_path(pointer: &str) -> Option<Vec<String>> {
    let rest = pointer.strip_prefix("/properties/")?;
    Some(rest.split('/').map(str::to_string).collect())
}

impl ResourceSchema {
    /// Wrap a provider schema document.
    ///
    /// Returns `None` when the document has no string `typeName`.
    pub fn from_provider(schema: Value) -> Option<Self> {
        let type_name = schema.get("typeName")?.as_str()?.to_string();
        let read_only = pointers(&schema, "readOnlyProperties");
        let create_only = pointers(&schema, "createOnlyProperties");
        Some(Self {
            type_name,
            schema,
            read_only,
            create_only,
        })
    }

    /// The resource type, e.g. `AWS::S3::Bucket`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The provider document, used as the root validation schema.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Read-only property paths.
    pub fn read_only(&self) -> &BTreeSet<Vec<String>> {
        &self.read_only
    }

    /// Create-only property paths.
    pub fn create_only(&self) -> &BTreeSet<Vec<String>> {
        &self.create_only
    }

    /// Whether the property at `cfn_path` is read-only.
    pub fn is_read_only(&self, cfn_path: &[String]) -> bool {
        self.read_only.iter().any(|p| p.as_slice() == cfn_path)
    }

    /// Names usable with `Fn::GetAtt`: read-only properties joined with `.`.
    pub fn attributes(&self) -> BTreeSet<String> {
        self.read_only
            .iter()
            .filter(|p| !p.iter().any(|s| s == "*"))
            .map(|p| p.join("."))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bucket() -> ResourceSchema {
        ResourceSchema::from_provider(json!({
            "typeName": "AWS::S3::Bucket",
            "properties": {"BucketName": {"type": "string"}, "Arn": {"type": "string"}},
            "readOnlyProperties": ["/properties/Arn", "/properties/Endpoint/Address"],
            "createOnlyProperties": ["/properties/BucketName"]
        }))
        .unwrap()
    }

    #[test]
    fn test_markers() {
        let b = bucket();
        assert_eq!(b.type_name(), "AWS::S3::Bucket");
        assert!(b.is_read_only(&["Arn".to_string()]));
        assert!(!b.is_read_only(&["BucketName".to_string()]));
        assert!(b.create_only().contains(&vec!["BucketName".to_string()]));
    }

    #[test]
    fn test_attributes() {
        let attrs = bucket().attributes();
        assert!(attrs.contains("Arn"));
        assert!(attrs.contains("Endpoint.Address"));
    }

    #[test]
    fn test_requires_type_name() {
        assert!(ResourceSchema::from_provider(json!({"properties": {}})).is_none());
        assert_eq!(pointer_to_path("/definitions/X"), None);
    }
}
