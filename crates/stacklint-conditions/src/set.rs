//! # Condition Set — Build and Solve
//!
//! A [`ConditionSet`] is the normalized form of a template's `Conditions`
//! section. It is built once per document, shared read-only across every
//! region pass, and answers satisfiability and implication questions.
//!
//! ## Variables and Constraints
//!
//! - Every distinct canonical `Fn::Equals` is one boolean variable (leaf).
//!   Two conditions built from the same predicate share the variable, which
//!   is how equivalent conditions are recognized.
//! - Leaves comparing the same subject (`Ref Env`, `Ref AWS::Region`, any
//!   other expression) against different literals form a group: at most one
//!   member can be true. When the subject is a parameter whose
//!   `AllowedValues` are all covered by the group, exactly one must be true.
//! - Leaves with a statically known value (literal comparisons, region-bound
//!   pseudo-parameters under a single region, literals outside a parameter's
//!   `AllowedValues`) are fixed before search.
//!
//! ## Solving
//!
//! Satisfiability uses three-valued propagation over the condition trees
//! plus backtracking over only the leaves the query depends on. Assigning a
//! leaf true immediately forces its group siblings false.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use stacklint_core::{
    sha256_digest, CanonicalBytes, ContentDigest, Parameter, PathSegment, Region, Template,
};

use crate::equals::{scalar_string, Equals, OperandKind};
use crate::error::{ConditionError, ConditionIssue, IssueKind};
use crate::expr::{CondExpr, Condition};
use crate::scenario::ScenarioSpace;

/// Partial assignment of leaf values.
pub(crate) type Assignment = BTreeMap<ContentDigest, bool>;

/// Leaves sharing a subject operand.
#[derive(Debug, Clone)]
struct LeafGroup {
    members: BTreeSet<ContentDigest>,
    /// Members comparing against an allowed value of the subject parameter,
    /// one of which must hold. Empty when the group is not exhaustive.
    exhaustive: BTreeSet<ContentDigest>,
}

/// The normalized conditions of one template.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    conditions: BTreeMap<String, Condition>,
    rejected: BTreeMap<String, IssueKind>,
    equals: BTreeMap<ContentDigest, Equals>,
    groups: Vec<LeafGroup>,
    group_of: BTreeMap<ContentDigest, usize>,
    allowed_values: BTreeMap<String, Vec<String>>,
}

impl ConditionSet {
    /// Build the set from a template's `Conditions` and `Parameters`.
    ///
    /// Rejected definitions are returned as issues and remembered, so that
    /// later questions about them raise `UnknownSatisfaction`.
    pub fn from_template(template: &Template) -> (Self, Vec<ConditionIssue>) {
        Self::build(template.conditions(), template.parameters())
    }

    /// Build the set from raw condition definitions.
    pub fn build(
        definitions: &Map<String, Value>,
        parameters: &BTreeMap<String, Parameter>,
    ) -> (Self, Vec<ConditionIssue>) {
        let mut builder = Builder {
            definitions,
            equals: BTreeMap::new(),
            done: BTreeMap::new(),
        };
        let mut conditions = BTreeMap::new();
        let mut rejected = BTreeMap::new();
        let mut issues = Vec::new();

        for name in definitions.keys() {
            match builder.resolve(name, &mut Vec::new()) {
                Ok(expr) => {
                    conditions.insert(name.clone(), Condition::new(name.clone(), expr));
                }
                Err(kind) => {
                    tracing::debug!(condition = %name, ?kind, "condition rejected");
                    issues.push(ConditionIssue {
                        name: name.clone(),
                        path: vec![PathSegment::from("Conditions"), PathSegment::from(name.as_str())],
                        kind: kind.clone(),
                    });
                    rejected.insert(name.clone(), kind);
                }
            }
        }

        let allowed_values: BTreeMap<String, Vec<String>> = parameters
            .iter()
            .filter(|(_, p)| !p.allowed_values.is_empty())
            .map(|(name, p)| {
                (
                    name.clone(),
                    p.allowed_values.iter().filter_map(scalar_string).collect(),
                )
            })
            .collect();

        let equals = builder.equals;
        let (groups, group_of) = build_groups(&equals, &allowed_values);

        tracing::debug!(
            conditions = conditions.len(),
            leaves = equals.len(),
            groups = groups.len(),
            "condition set built"
        );

        (
            Self {
                conditions,
                rejected,
                equals,
                groups,
                group_of,
                allowed_values,
            },
            issues,
        )
    }

    /// Whether `name` is a usable condition.
    pub fn contains(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    /// Look up a usable condition.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSatisfaction` for undefined or rejected names.
    pub fn condition(&self, name: &str) -> Result<&Condition, ConditionError> {
        if let Some(c) = self.conditions.get(name) {
            return Ok(c);
        }
        let reason = match self.rejected.get(name) {
            Some(IssueKind::Cyclic { chain }) => format!("cyclic definition {}", chain.join(" -> ")),
            Some(IssueKind::Undefined { reference }) => {
                format!("references undefined condition {reference:?}")
            }
            Some(IssueKind::Malformed { reason }) => reason.clone(),
            None => "condition is not defined".to_string(),
        };
        Err(ConditionError::UnknownSatisfaction {
            name: name.to_string(),
            reason,
        })
    }

    /// Names of usable conditions, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    /// Number of usable conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True when no usable condition exists.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of distinct canonical leaves.
    pub fn leaf_count(&self) -> usize {
        self.equals.len()
    }

    /// Whether two conditions have the same normalized content.
    pub fn equivalent(&self, a: &str, b: &str) -> Result<bool, ConditionError> {
        Ok(self.condition(a)?.hash() == self.condition(b)?.hash())
    }

    /// Whether an assignment of condition values can hold simultaneously.
    pub fn is_consistent(
        &self,
        assignment: &BTreeMap<String, bool>,
        regions: &[Region],
    ) -> Result<bool, ConditionError> {
        let constraints = self.constraints(assignment)?;
        Ok(self.solve(&constraints, regions))
    }

    /// Whether `name` can take `desired` given the `current` assignment.
    pub fn is_satisfiable(
        &self,
        name: &str,
        desired: bool,
        current: &BTreeMap<String, bool>,
        regions: &[Region],
    ) -> Result<bool, ConditionError> {
        self.condition(name)?;
        if let Some(existing) = current.get(name) {
            if *existing != desired {
                return Ok(false);
            }
        }
        let mut all = current.clone();
        all.insert(name.to_string(), desired);
        self.is_consistent(&all, regions)
    }

    /// Whether `name` necessarily holds whenever `scenario` holds.
    ///
    /// Vacuously true when the scenario itself is unsatisfiable.
    pub fn check_implies(
        &self,
        scenario: &BTreeMap<String, bool>,
        name: &str,
        regions: &[Region],
    ) -> Result<bool, ConditionError> {
        Ok(!self.is_satisfiable(name, false, scenario, regions)?)
    }

    /// Whether parameter `parameter` can equal `value` while `assignment`
    /// holds.
    ///
    /// Every leaf comparing `{"Ref": parameter}` against a literal is pinned
    /// to the outcome of that comparison before solving.
    pub fn admits_parameter_value(
        &self,
        parameter: &str,
        value: &str,
        assignment: &BTreeMap<String, bool>,
        regions: &[Region],
    ) -> Result<bool, ConditionError> {
        if assignment.is_empty() {
            return Ok(true);
        }
        let constraints = self.constraints(assignment)?;
        let mut relevant: BTreeSet<ContentDigest> = constraints
            .iter()
            .flat_map(|(e, _)| e.leaves())
            .collect();
        let mut pinned = Vec::new();
        for (hash, leaf) in &self.equals {
            let Some((subject, literal)) = leaf.subject_and_literal() else {
                continue;
            };
            if matches!(subject.kind(), OperandKind::Parameter(name) if name == parameter) {
                pinned.push((*hash, literal == value));
                relevant.insert(*hash);
            }
        }
        let Some(mut base) = self.fixed_assignment(&relevant, regions) else {
            return Ok(false);
        };
        for (leaf, holds) in pinned {
            if !self.propagate(leaf, holds, &mut base) {
                return Ok(false);
            }
        }
        let free: Vec<ContentDigest> = relevant
            .iter()
            .filter(|l| !base.contains_key(*l))
            .copied()
            .collect();
        Ok(self.search(&constraints, &free, base))
    }

    /// The truth values `name` can take when validating only `region`.
    pub fn build_scenarios_on_region(
        &self,
        name: &str,
        region: &Region,
    ) -> Result<Vec<bool>, ConditionError> {
        let regions = std::slice::from_ref(region);
        let empty = BTreeMap::new();
        let mut out = Vec::new();
        for value in [true, false] {
            if self.is_satisfiable(name, value, &empty, regions)? {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Every reachable assignment of the named conditions.
    ///
    /// The returned space is lazy and restartable: each call to
    /// [`ScenarioSpace::iter`] enumerates from the beginning.
    ///
    /// # Errors
    ///
    /// `UnknownSatisfaction` for unusable names; `TooComplex` when more than
    /// `max_leaves` free leaves would have to be enumerated.
    pub fn build_scenarios<'a, I, S>(
        &'a self,
        names: I,
        regions: &[Region],
        max_leaves: usize,
    ) -> Result<ScenarioSpace<'a>, ConditionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scenarios_given(names, &BTreeMap::new(), regions, max_leaves)
    }

    /// Like [`build_scenarios`](Self::build_scenarios) but only yields
    /// scenarios consistent with an assignment already in force.
    pub fn scenarios_given<'a, I, S>(
        &'a self,
        names: I,
        given: &BTreeMap<String, bool>,
        regions: &[Region],
        max_leaves: usize,
    ) -> Result<ScenarioSpace<'a>, ConditionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets: Vec<(String, CondExpr)> = Vec::new();
        let mut relevant = BTreeSet::new();
        let mut seen = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name.to_string()) {
                continue;
            }
            let condition = self.condition(name)?;
            relevant.extend(condition.leaves().iter().copied());
            targets.push((name.to_string(), condition.expr().clone()));
        }
        let given = self
            .constraints(given)?
            .into_iter()
            .map(|(e, v)| (e.clone(), v))
            .collect::<Vec<_>>();

        let Some(base) = self.fixed_assignment(&relevant, regions) else {
            return Ok(ScenarioSpace::empty(self, regions.to_vec()));
        };
        let free: Vec<ContentDigest> = relevant
            .iter()
            .filter(|l| !base.contains_key(*l))
            .copied()
            .collect();
        if free.len() > max_leaves {
            return Err(ConditionError::TooComplex {
                leaves: free.len(),
                limit: max_leaves,
            });
        }
        Ok(ScenarioSpace::new(
            self,
            targets,
            given,
            free,
            base,
            regions.to_vec(),
        ))
    }

    /// Content key for caching a consistency query.
    pub fn query_key(
        &self,
        assignment: &BTreeMap<String, bool>,
        regions: &[Region],
    ) -> Result<ContentDigest, ConditionError> {
        let mut entries: Vec<(String, bool)> = Vec::with_capacity(assignment.len());
        for (name, value) in assignment {
            entries.push((self.condition(name)?.hash().to_hex(), *value));
        }
        entries.sort();
        entries.dedup();
        let regions: Vec<&str> = regions.iter().map(Region::as_str).collect();
        Ok(sha256_digest(&CanonicalBytes::from_json(&json!({
            "assume": entries,
            "regions": regions,
        }))))
    }

    fn constraints(
        &self,
        assignment: &BTreeMap<String, bool>,
    ) -> Result<Vec<(&CondExpr, bool)>, ConditionError> {
        assignment
            .iter()
            .map(|(name, value)| Ok((self.condition(name)?.expr(), *value)))
            .collect()
    }

    /// Fixed leaf values for `leaves`, with group propagation applied.
    ///
    /// `None` when the fixed values already contradict each other.
    pub(crate) fn fixed_assignment(
        &self,
        leaves: &BTreeSet<ContentDigest>,
        regions: &[Region],
    ) -> Option<Assignment> {
        let mut assignment = Assignment::new();
        for leaf in leaves {
            let fixed = self
                .equals
                .get(leaf)
                .and_then(|e| e.fixed_value(regions, &self.allowed_values));
            if let Some(value) = fixed {
                if !self.propagate(*leaf, value, &mut assignment) {
                    return None;
                }
            }
        }
        Some(assignment)
    }

    /// Assign `leaf` and force its group siblings false when it is true.
    ///
    /// Returns false on contradiction.
    pub(crate) fn propagate(
        &self,
        leaf: ContentDigest,
        value: bool,
        assignment: &mut Assignment,
    ) -> bool {
        if let Some(existing) = assignment.get(&leaf) {
            return *existing == value;
        }
        assignment.insert(leaf, value);
        if value {
            if let Some(&g) = self.group_of.get(&leaf) {
                for sibling in &self.groups[g].members {
                    if *sibling == leaf {
                        continue;
                    }
                    match assignment.get(sibling) {
                        Some(true) => return false,
                        Some(false) => {}
                        None => {
                            assignment.insert(*sibling, false);
                        }
                    }
                }
            }
        }
        true
    }

    /// Group constraints hold for the assigned part of `assignment`.
    pub(crate) fn groups_consistent(&self, assignment: &Assignment) -> bool {
        self.groups.iter().all(|group| {
            let trues = group
                .members
                .iter()
                .filter(|m| assignment.get(*m) == Some(&true))
                .count();
            let allowed_all_false = !group.exhaustive.is_empty()
                && group
                    .exhaustive
                    .iter()
                    .all(|m| assignment.get(m) == Some(&false));
            trues <= 1 && !allowed_all_false
        })
    }

    /// Decide whether every `(expr, want)` constraint can hold at once.
    pub(crate) fn solve(&self, constraints: &[(&CondExpr, bool)], regions: &[Region]) -> bool {
        let relevant: BTreeSet<ContentDigest> = constraints
            .iter()
            .flat_map(|(e, _)| e.leaves())
            .collect();
        let Some(base) = self.fixed_assignment(&relevant, regions) else {
            return false;
        };
        let free: Vec<ContentDigest> = relevant
            .iter()
            .filter(|l| !base.contains_key(*l))
            .copied()
            .collect();
        self.search(constraints, &free, base)
    }

    fn search(
        &self,
        constraints: &[(&CondExpr, bool)],
        free: &[ContentDigest],
        assignment: Assignment,
    ) -> bool {
        if !self.groups_consistent(&assignment) {
            return false;
        }
        let mut decided = true;
        for (expr, want) in constraints {
            match expr.eval(&|h| assignment.get(h).copied()) {
                Some(v) if v != *want => return false,
                Some(_) => {}
                None => decided = false,
            }
        }
        if decided {
            return true;
        }
        let Some(next) = free.iter().find(|l| !assignment.contains_key(*l)) else {
            return false;
        };
        for value in [true, false] {
            let mut branch = assignment.clone();
            if self.propagate(*next, value, &mut branch) && self.search(constraints, free, branch) {
                return true;
            }
        }
        false
    }
}

fn build_groups(
    equals: &BTreeMap<ContentDigest, Equals>,
    allowed_values: &BTreeMap<String, Vec<String>>,
) -> (Vec<LeafGroup>, BTreeMap<ContentDigest, usize>) {
    // subject digest -> (subject kind, member -> literal)
    let mut by_subject: BTreeMap<ContentDigest, (OperandKind, BTreeMap<ContentDigest, String>)> =
        BTreeMap::new();
    for (hash, leaf) in equals {
        if let Some((subject, literal)) = leaf.subject_and_literal() {
            by_subject
                .entry(subject.digest())
                .or_insert_with(|| (subject.kind().clone(), BTreeMap::new()))
                .1
                .insert(*hash, literal.to_string());
        }
    }

    let mut groups = Vec::new();
    let mut group_of = BTreeMap::new();
    for (_, (kind, literals)) in by_subject {
        // Leaves over literals outside AllowedValues are always false and
        // never count towards the exactly-one constraint.
        let exhaustive: BTreeSet<ContentDigest> = match &kind {
            OperandKind::Parameter(name) => match allowed_values.get(name) {
                Some(allowed)
                    if !allowed.is_empty()
                        && allowed.iter().all(|a| literals.values().any(|l| l == a)) =>
                {
                    literals
                        .iter()
                        .filter(|(_, l)| allowed.contains(l))
                        .map(|(h, _)| *h)
                        .collect()
                }
                _ => BTreeSet::new(),
            },
            _ => BTreeSet::new(),
        };
        if literals.len() < 2 && exhaustive.is_empty() {
            continue;
        }
        let idx = groups.len();
        for m in literals.keys() {
            group_of.insert(*m, idx);
        }
        groups.push(LeafGroup {
            members: literals.into_keys().collect(),
            exhaustive,
        });
    }
    (groups, group_of)
}

struct Builder<'a> {
    definitions: &'a Map<String, Value>,
    equals: BTreeMap<ContentDigest, Equals>,
    done: BTreeMap<String, Result<CondExpr, IssueKind>>,
}

impl Builder<'_> {
    fn resolve(&mut self, name: &str, stack: &mut Vec<String>) -> Result<CondExpr, IssueKind> {
        if let Some(done) = self.done.get(name) {
            return done.clone();
        }
        if let Some(pos) = stack.iter().position(|s| s == name) {
            let mut chain = stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(IssueKind::Cyclic { chain });
        }
        let Some(definition) = self.definitions.get(name) else {
            return Err(IssueKind::Undefined {
                reference: name.to_string(),
            });
        };
        stack.push(name.to_string());
        let result = self.parse(definition, stack);
        stack.pop();
        self.done.insert(name.to_string(), result.clone());
        result
    }

    fn parse(&mut self, value: &Value, stack: &mut Vec<String>) -> Result<CondExpr, IssueKind> {
        let malformed = |reason: String| IssueKind::Malformed { reason };
        let (function, args) = match value {
            Value::Object(m) if m.len() == 1 => m.iter().next().ok_or_else(|| {
                malformed("expected a single condition function".to_string())
            })?,
            _ => {
                return Err(malformed(
                    "expected an object with exactly one condition function".to_string(),
                ))
            }
        };
        match function.as_str() {
            "Fn::Equals" => {
                let leaf = Equals::new(args).map_err(malformed)?;
                let hash = leaf.hash();
                self.equals.entry(hash).or_insert(leaf);
                Ok(CondExpr::Leaf(hash))
            }
            "Fn::And" | "Fn::Or" => {
                let items = args
                    .as_array()
                    .ok_or_else(|| malformed(format!("{function} expects a list")))?;
                if !(2..=10).contains(&items.len()) {
                    return Err(malformed(format!(
                        "{function} expects between 2 and 10 conditions, found {}",
                        items.len()
                    )));
                }
                let children = items
                    .iter()
                    .map(|item| self.parse(item, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if function == "Fn::And" {
                    CondExpr::And(children)
                } else {
                    CondExpr::Or(children)
                })
            }
            "Fn::Not" => match args.as_array().map(Vec::as_slice) {
                Some([inner]) => Ok(CondExpr::Not(Box::new(self.parse(inner, stack)?))),
                _ => Err(malformed("Fn::Not expects a list of one condition".to_string())),
            },
            "Condition" => {
                let target = args
                    .as_str()
                    .ok_or_else(|| malformed("Condition expects a condition name".to_string()))?;
                let current = stack.last().cloned().unwrap_or_default();
                match self.resolve(target, stack) {
                    Ok(expr) => Ok(expr),
                    Err(IssueKind::Cyclic { chain }) if chain.contains(&current) => {
                        Err(IssueKind::Cyclic { chain })
                    }
                    Err(_) if !self.definitions.contains_key(target) => Err(IssueKind::Undefined {
                        reference: target.to_string(),
                    }),
                    Err(_) => Err(malformed(format!("depends on invalid condition {target:?}"))),
                }
            }
            other => Err(malformed(format!("{other} is not a condition function"))),
        }
    }
}
