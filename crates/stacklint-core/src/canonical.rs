//! # Canonical Encoding
//!
//! Condition hashes, resolver cache keys and `Equals` operand identities are
//! all computed from [`CanonicalBytes`]: the RFC 8785 (JCS) text of a JSON
//! value, produced by `serde_jcs`. Object key order never affects the bytes.
//!
//! Two encodings exist:
//!
//! | Encoding             | Scalars                              | Used for                  |
//! |----------------------|--------------------------------------|---------------------------|
//! | [`Encoding::Exact`]  | kept as written                      | cache keys, tree hashes   |
//! | [`Encoding::Textual`]| numbers and booleans become strings  | `Equals` operand identity |
//!
//! `Equals` compares its operands as text, so `{"Fn::Equals": [1, "1"]}` and
//! `{"Fn::Equals": ["1", "1"]}` must hash to the same leaf. The textual
//! encoding gives them identical bytes.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// How scalar leaves are treated before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Scalars keep their JSON type.
    Exact,
    /// Numbers and booleans are rewritten as strings.
    Textual,
}

/// JCS-encoded bytes of a JSON value.
///
/// The inner buffer is private; every instance comes from one of the
/// constructors below and is therefore valid UTF-8 with sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Encode any serializable value with [`Encoding::Exact`].
    ///
    /// # Errors
    ///
    /// Fails when `value` has no JSON representation (non-string map keys,
    /// non-finite floats).
    pub fn new(value: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Self::encode(value, Encoding::Exact)
    }

    /// Encode with [`Encoding::Textual`].
    ///
    /// # Errors
    ///
    /// Same as [`CanonicalBytes::new`].
    pub fn scalar_insensitive(value: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Self::encode(value, Encoding::Textual)
    }

    /// Encode `value` under the given scalar treatment.
    ///
    /// # Errors
    ///
    /// Same as [`CanonicalBytes::new`].
    pub fn encode(value: &impl Serialize, encoding: Encoding) -> Result<Self, CanonicalizationError> {
        let mut tree = serde_json::to_value(value)?;
        if encoding == Encoding::Textual {
            stringify_scalars(&mut tree);
        }
        Ok(Self(serde_jcs::to_vec(&tree)?))
    }

    /// Exact encoding of a tree that is already a `serde_json::Value`.
    ///
    /// Such a tree only has string keys and finite numbers, so encoding
    /// cannot fail.
    pub fn from_json(value: &Value) -> Self {
        Self(serde_jcs::to_vec(value).expect("BUG: serde_json::Value failed JCS encoding"))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The encoding as text.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

fn stringify_scalars(value: &mut Value) {
    match value {
        Value::Bool(b) => *value = Value::String(b.to_string()),
        Value::Number(n) => *value = Value::String(n.to_string()),
        Value::Array(items) => items.iter_mut().for_each(stringify_scalars),
        Value::Object(map) => map.values_mut().for_each(stringify_scalars),
        Value::Null | Value::String(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_are_sorted_at_every_depth() {
        let cb = CanonicalBytes::new(&json!({"Z": {"y": 1, "b": 2}, "A": [3, 1]})).unwrap();
        assert_eq!(cb.as_str(), r#"{"A":[3,1],"Z":{"b":2,"y":1}}"#);
    }

    #[test]
    fn test_exact_encoding_distinguishes_number_and_string() {
        let number = CanonicalBytes::new(&json!({"Fn::Equals": [1, "x"]})).unwrap();
        let string = CanonicalBytes::new(&json!({"Fn::Equals": ["1", "x"]})).unwrap();
        assert_ne!(number, string);
    }

    #[test]
    fn test_textual_encoding_merges_scalars() {
        let a = CanonicalBytes::scalar_insensitive(&json!({"Fn::Equals": [1, true]})).unwrap();
        let b = CanonicalBytes::scalar_insensitive(&json!({"Fn::Equals": ["1", "true"]})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), r#"{"Fn::Equals":["1","true"]}"#);
    }

    #[test]
    fn test_textual_encoding_keeps_null() {
        let cb = CanonicalBytes::encode(&json!([null, 2.5]), Encoding::Textual).unwrap();
        assert_eq!(cb.as_str(), r#"[null,"2.5"]"#);
    }

    #[test]
    fn test_from_json_agrees_with_new() {
        let v = json!({"Ref": "AWS::Region", "extra": [{"b": 1, "a": null}]});
        assert_eq!(CanonicalBytes::from_json(&v), CanonicalBytes::new(&v).unwrap());
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(CanonicalBytes::new(&json!({})).unwrap().as_bytes(), b"{}");
        assert_eq!(CanonicalBytes::new(&json!([])).unwrap().as_bytes(), b"[]");
    }

    #[test]
    fn test_non_string_keys_are_rejected() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], 1);
        assert!(CanonicalBytes::new(&map).is_err());
    }
}
