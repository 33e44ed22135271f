//! # Canonical `Fn::Equals` Leaves
//!
//! Every `Fn::Equals` test becomes one [`Equals`] leaf: the boolean variable
//! the rest of the engine reasons over. Operands are compared as strings,
//! so both the ordering and the hash use scalar-insensitive canonical bytes.
//!
//! ## Canonicalization
//!
//! The two operands are sorted by their canonical serialized form before the
//! leaf is hashed. `Equals(A, B)` and `Equals(B, A)` therefore produce the
//! same [`ContentDigest`] and are the same variable everywhere.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use stacklint_core::{sha256_digest, CanonicalBytes, ContentDigest, Region};

/// Pseudo-parameter names whose value is fixed once the region is known.
const REGION_BOUND_PSEUDOS: &[&str] = &["AWS::Region", "AWS::Partition", "AWS::URLSuffix"];

/// What an `Equals` operand is, as far as static reasoning cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    /// A string, number or boolean, in string form.
    Literal(String),
    /// `{"Ref": "AWS::..."}`.
    Pseudo(String),
    /// `{"Ref": "<parameter>"}`.
    Parameter(String),
    /// Any other expression.
    Expression,
}

/// One side of an `Equals` test.
#[derive(Debug, Clone)]
pub struct Operand {
    value: Value,
    canonical: CanonicalBytes,
    digest: ContentDigest,
    kind: OperandKind,
}

impl Operand {
    fn new(value: Value) -> Result<Self, String> {
        let canonical = CanonicalBytes::scalar_insensitive(&value)
            .map_err(|e| format!("cannot canonicalize operand: {e}"))?;
        let digest = sha256_digest(&canonical);
        let kind = classify(&value);
        Ok(Self {
            value,
            canonical,
            digest,
            kind,
        })
    }

    /// The operand as written.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Hash of the operand's canonical form.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }

    /// Classification used for fixing and grouping.
    pub fn kind(&self) -> &OperandKind {
        &self.kind
    }
}

fn classify(value: &Value) -> OperandKind {
    match value {
        Value::String(s) => OperandKind::Literal(s.clone()),
        Value::Number(n) => OperandKind::Literal(n.to_string()),
        Value::Bool(b) => OperandKind::Literal(b.to_string()),
        Value::Object(m) if m.len() == 1 => match m.get("Ref").and_then(Value::as_str) {
            Some(name) if name.starts_with("AWS::") => OperandKind::Pseudo(name.to_string()),
            Some(name) => OperandKind::Parameter(name.to_string()),
            None => OperandKind::Expression,
        },
        _ => OperandKind::Expression,
    }
}

/// String form of a scalar value, as `Fn::Equals` compares it.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A canonical `Fn::Equals` test.
#[derive(Debug, Clone)]
pub struct Equals {
    left: Operand,
    right: Operand,
    hash: ContentDigest,
}

impl PartialEq for Equals {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Equals {}

impl Equals {
    /// Build a leaf from the argument list of `Fn::Equals`.
    ///
    /// # Errors
    ///
    /// Returns a message when the arguments are not a two-element list.
    pub fn new(args: &Value) -> Result<Self, String> {
        let items = args
            .as_array()
            .ok_or_else(|| "Fn::Equals expects a list of two values".to_string())?;
        let [a, b] = items.as_slice() else {
            return Err(format!(
                "Fn::Equals expects exactly two values, found {}",
                items.len()
            ));
        };
        let mut pair = [Operand::new(a.clone())?, Operand::new(b.clone())?];
        pair.sort_by(|x, y| x.canonical.cmp(&y.canonical));
        let [left, right] = pair;
        let canonical = CanonicalBytes::scalar_insensitive(&json!({
            "Fn::Equals": [left.value, right.value]
        }))
        .map_err(|e| format!("cannot canonicalize Fn::Equals: {e}"))?;
        Ok(Self {
            hash: sha256_digest(&canonical),
            left,
            right,
        })
    }

    /// The leaf's identity.
    pub fn hash(&self) -> ContentDigest {
        self.hash
    }

    /// Operands in canonical order.
    pub fn operands(&self) -> (&Operand, &Operand) {
        (&self.left, &self.right)
    }

    /// The `(subject, literal)` pair when exactly one side is a literal.
    ///
    /// Leaves sharing a subject with different literals cannot both be true.
    pub fn subject_and_literal(&self) -> Option<(&Operand, &str)> {
        match (&self.left.kind, &self.right.kind) {
            (OperandKind::Literal(_), OperandKind::Literal(_)) => None,
            (OperandKind::Literal(l), _) => Some((&self.right, l.as_str())),
            (_, OperandKind::Literal(l)) => Some((&self.left, l.as_str())),
            _ => None,
        }
    }

    /// The value this leaf takes regardless of any assignment, if known.
    ///
    /// - literal vs literal: string comparison;
    /// - identical operands: true;
    /// - region-bound pseudo-parameter vs literal with exactly one region;
    /// - parameter vs literal outside the parameter's `AllowedValues`: false;
    /// - parameter with a single allowed value vs that value: true.
    pub fn fixed_value(
        &self,
        regions: &[Region],
        allowed_values: &BTreeMap<String, Vec<String>>,
    ) -> Option<bool> {
        if self.left.canonical == self.right.canonical {
            return Some(true);
        }
        if let (OperandKind::Literal(a), OperandKind::Literal(b)) =
            (&self.left.kind, &self.right.kind)
        {
            return Some(a == b);
        }
        let (subject, literal) = self.subject_and_literal()?;
        match subject.kind() {
            OperandKind::Pseudo(name) if REGION_BOUND_PSEUDOS.contains(&name.as_str()) => {
                let [region] = regions else {
                    return None;
                };
                let actual = match name.as_str() {
                    "AWS::Region" => region.as_str().to_string(),
                    "AWS::Partition" => region.partition().as_str().to_string(),
                    _ => region.url_suffix().to_string(),
                };
                Some(actual == literal)
            }
            OperandKind::Parameter(name) => {
                let allowed = allowed_values.get(name)?;
                if allowed.is_empty() {
                    None
                } else if !allowed.iter().any(|a| a == literal) {
                    Some(false)
                } else if allowed.len() == 1 {
                    Some(true)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
