//! # Scenario Enumeration
//!
//! A scenario is one reachable assignment of truth values to a chosen set
//! of condition names. [`ScenarioSpace`] enumerates them lazily by
//! depth-first search over the free leaves those conditions depend on,
//! pruning partial assignments that violate group constraints and skipping
//! duplicate scenarios (different leaf assignments can give the same
//! condition values).
//!
//! The space is restartable: [`ScenarioSpace::iter`] always starts from the
//! beginning, so a caller can walk it more than once.

use std::collections::{BTreeMap, BTreeSet};

use stacklint_core::{ContentDigest, Region};

use crate::expr::CondExpr;
use crate::set::{Assignment, ConditionSet};

/// One reachable assignment of condition names to values.
pub type Scenario = BTreeMap<String, bool>;

/// All reachable scenarios for a set of condition names.
#[derive(Debug, Clone)]
pub struct ScenarioSpace<'a> {
    set: &'a ConditionSet,
    targets: Vec<(String, CondExpr)>,
    given: Vec<(CondExpr, bool)>,
    free: Vec<ContentDigest>,
    base: Option<Assignment>,
    regions: Vec<Region>,
}

impl<'a> ScenarioSpace<'a> {
    pub(crate) fn new(
        set: &'a ConditionSet,
        targets: Vec<(String, CondExpr)>,
        given: Vec<(CondExpr, bool)>,
        free: Vec<ContentDigest>,
        base: Assignment,
        regions: Vec<Region>,
    ) -> Self {
        Self {
            set,
            targets,
            given,
            free,
            base: Some(base),
            regions,
        }
    }

    /// A space with no reachable scenario.
    pub(crate) fn empty(set: &'a ConditionSet, regions: Vec<Region>) -> Self {
        Self {
            set,
            targets: Vec::new(),
            given: Vec::new(),
            free: Vec::new(),
            base: None,
            regions,
        }
    }

    /// Condition names covered by each scenario.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(n, _)| n.as_str())
    }

    /// Number of free leaves the enumeration branches on.
    pub fn free_leaves(&self) -> usize {
        self.free.len()
    }

    /// Enumerate scenarios from the beginning.
    pub fn iter(&self) -> Scenarios<'_> {
        let stack = self.base.clone().into_iter().collect();
        Scenarios {
            space: self,
            stack,
            seen: BTreeSet::new(),
        }
    }
}

impl<'s> IntoIterator for &'s ScenarioSpace<'_> {
    type Item = Scenario;
    type IntoIter = Scenarios<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a [`ScenarioSpace`].
#[derive(Debug)]
pub struct Scenarios<'s> {
    space: &'s ScenarioSpace<'s>,
    stack: Vec<Assignment>,
    seen: BTreeSet<Vec<bool>>,
}

impl Scenarios<'_> {
    fn complete(&mut self, assignment: &Assignment) -> Option<Scenario> {
        let space = self.space;
        let mut values = Vec::with_capacity(space.targets.len());
        for (_, expr) in &space.targets {
            values.push(expr.eval(&|h| assignment.get(h).copied())?);
        }
        if !self.seen.insert(values.clone()) {
            return None;
        }
        if !space.given.is_empty() {
            let mut constraints: Vec<(&CondExpr, bool)> =
                space.given.iter().map(|(e, v)| (e, *v)).collect();
            constraints.extend(space.targets.iter().map(|(_, e)| e).zip(values.iter().copied()));
            if !space.set.solve(&constraints, &space.regions) {
                return None;
            }
        }
        Some(
            space
                .targets
                .iter()
                .map(|(n, _)| n.clone())
                .zip(values)
                .collect(),
        )
    }
}

impl Iterator for Scenarios<'_> {
    type Item = Scenario;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(assignment) = self.stack.pop() {
            let set = self.space.set;
            if !set.groups_consistent(&assignment) {
                continue;
            }
            let next = self
                .space
                .free
                .iter()
                .find(|l| !assignment.contains_key(*l))
                .copied();
            match next {
                None => {
                    if let Some(scenario) = self.complete(&assignment) {
                        return Some(scenario);
                    }
                }
                Some(leaf) => {
                    // Push false first so the true branch is explored first.
                    for value in [false, true] {
                        let mut branch = assignment.clone();
                        if set.propagate(leaf, value, &mut branch) {
                            self.stack.push(branch);
                        }
                    }
                }
            }
        }
        None
    }
}
