//! # Condition Expressions
//!
//! A condition is a tree of `And`/`Or`/`Not` nodes over canonical
//! [`Equals`](crate::equals::Equals) leaves. `Condition` references are
//! inlined when the set is built, so trees never mention names.
//!
//! The tree hash is order-insensitive for `And`/`Or` (children are hashed and
//! sorted), which makes two conditions with the same normalized content equal
//! regardless of their names or operand order.

use std::collections::BTreeSet;

use serde_json::json;

use stacklint_core::{sha256_digest, CanonicalBytes, ContentDigest};

/// A normalized boolean expression over leaf hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondExpr {
    /// An `Fn::Equals` leaf, by hash.
    Leaf(ContentDigest),
    /// `Fn::And`.
    And(Vec<CondExpr>),
    /// `Fn::Or`.
    Or(Vec<CondExpr>),
    /// `Fn::Not`.
    Not(Box<CondExpr>),
}

impl CondExpr {
    /// Three-valued (Kleene) evaluation under a partial leaf assignment.
    ///
    /// Returns `None` when the assignment does not decide the expression.
    pub fn eval(&self, leaf: &impl Fn(&ContentDigest) -> Option<bool>) -> Option<bool> {
        match self {
            Self::Leaf(h) => leaf(h),
            Self::Not(inner) => inner.eval(leaf).map(|v| !v),
            Self::And(children) => {
                let mut undecided = false;
                for child in children {
                    match child.eval(leaf) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => undecided = true,
                    }
                }
                if undecided {
                    None
                } else {
                    Some(true)
                }
            }
            Self::Or(children) => {
                let mut undecided = false;
                for child in children {
                    match child.eval(leaf) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => undecided = true,
                    }
                }
                if undecided {
                    None
                } else {
                    Some(false)
                }
            }
        }
    }

    /// Every leaf hash reachable from this expression.
    pub fn leaves(&self) -> BTreeSet<ContentDigest> {
        let mut out = BTreeSet::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut BTreeSet<ContentDigest>) {
        match self {
            Self::Leaf(h) => {
                out.insert(*h);
            }
            Self::Not(inner) => inner.collect_leaves(out),
            Self::And(children) | Self::Or(children) => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
        }
    }

    /// Order-insensitive content hash of the normalized tree.
    pub fn digest(&self) -> ContentDigest {
        let node = match self {
            Self::Leaf(h) => json!({"Equals": h.to_hex()}),
            Self::Not(inner) => json!({"Not": inner.digest().to_hex()}),
            Self::And(children) => json!({"And": sorted_child_hashes(children)}),
            Self::Or(children) => json!({"Or": sorted_child_hashes(children)}),
        };
        sha256_digest(&CanonicalBytes::from_json(&node))
    }
}

fn sorted_child_hashes(children: &[CondExpr]) -> Vec<String> {
    let set: BTreeSet<String> = children.iter().map(|c| c.digest().to_hex()).collect();
    set.into_iter().collect()
}

/// A named, normalized condition.
#[derive(Debug, Clone)]
pub struct Condition {
    name: String,
    expr: CondExpr,
    hash: ContentDigest,
    leaves: BTreeSet<ContentDigest>,
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Condition {}

impl Condition {
    /// Wrap a normalized expression under a name.
    pub fn new(name: impl Into<String>, expr: CondExpr) -> Self {
        let hash = expr.digest();
        let leaves = expr.leaves();
        Self {
            name: name.into(),
            expr,
            hash,
            leaves,
        }
    }

    /// The condition's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized expression.
    pub fn expr(&self) -> &CondExpr {
        &self.expr
    }

    /// Content hash of the normalized expression.
    pub fn hash(&self) -> ContentDigest {
        self.hash
    }

    /// Leaves the condition depends on.
    pub fn leaves(&self) -> &BTreeSet<ContentDigest> {
        &self.leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> CondExpr {
        CondExpr::Leaf(ContentDigest::from_bytes([n; 32]))
    }

    #[test]
    fn test_kleene_and_or() {
        let a = ContentDigest::from_bytes([1; 32]);
        let only_a_false = |h: &ContentDigest| if *h == a { Some(false) } else { None };
        let and = CondExpr::And(vec![leaf(1), leaf(2)]);
        let or = CondExpr::Or(vec![leaf(1), leaf(2)]);
        assert_eq!(and.eval(&only_a_false), Some(false));
        assert_eq!(or.eval(&only_a_false), None);
        let not = CondExpr::Not(Box::new(leaf(1)));
        assert_eq!(not.eval(&only_a_false), Some(true));
    }

    #[test]
    fn test_digest_ignores_child_order() {
        let x = CondExpr::And(vec![leaf(1), leaf(2)]);
        let y = CondExpr::And(vec![leaf(2), leaf(1)]);
        assert_eq!(x.digest(), y.digest());
        let z = CondExpr::Or(vec![leaf(1), leaf(2)]);
        assert_ne!(x.digest(), z.digest());
    }

    #[test]
    fn test_conditions_equal_by_content() {
        let a = Condition::new("A", CondExpr::Or(vec![leaf(3), leaf(4)]));
        let b = Condition::new("B", CondExpr::Or(vec![leaf(4), leaf(3)]));
        assert_eq!(a, b);
        assert_eq!(a.leaves().len(), 2);
    }
}
