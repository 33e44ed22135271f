//! # Condition State
//!
//! The condition assumptions in force at one point of a validation walk.
//! A [`ConditionState`] pairs a shared, read-only [`ConditionSet`] with the
//! region list of the current pass and the map of condition values already
//! assumed on the way down. Entering an `Fn::If` branch or a resource with a
//! `Condition` produces a new state through [`ConditionState::evolve`]; the
//! receiver is never modified.
//!
//! ## Invariants
//!
//! - A state's assignment is always satisfiable.
//! - Status is monotonic: `Unknown -> True` or `Unknown -> False`; a known
//!   value never flips.
//! - Consistency answers are memoized in a [`SatCache`] shared by every
//!   state of one pass.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use stacklint_core::{ContentDigest, Region};

use crate::error::ConditionError;
use crate::scenario::ScenarioSpace;
use crate::set::ConditionSet;

/// Tri-state status of a condition at a point of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConditionStatus {
    /// Nothing assumed yet.
    #[default]
    Unknown,
    /// Assumed true.
    True,
    /// Assumed false.
    False,
}

/// A status transition that would flip a known value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("condition status cannot change from {current:?} to {requested}")]
pub struct StatusConflict {
    /// The status in force.
    pub current: ConditionStatus,
    /// The value requested.
    pub requested: bool,
}

impl ConditionStatus {
    /// Status for a known value.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }

    /// The known value, if any.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::True => Some(true),
            Self::False => Some(false),
        }
    }

    /// Move to a known value.
    ///
    /// # Errors
    ///
    /// Returns [`StatusConflict`] if the status is already the opposite value.
    pub fn transition(self, value: bool) -> Result<Self, StatusConflict> {
        match self.as_bool() {
            Some(current) if current != value => Err(StatusConflict {
                current: self,
                requested: value,
            }),
            _ => Ok(Self::from_bool(value)),
        }
    }
}

/// Memo of consistency answers, keyed by a content digest of the query.
///
/// Scoped to one validation pass; safe to share across threads.
#[derive(Debug, Default)]
pub struct SatCache {
    entries: Mutex<HashMap<ContentDigest, bool>>,
    hits: Mutex<u64>,
}

impl SatCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &ContentDigest) -> Option<bool> {
        let found = self.entries.lock().get(key).copied();
        if found.is_some() {
            *self.hits.lock() += 1;
        }
        found
    }

    fn insert(&self, key: ContentDigest, value: bool) {
        self.entries.lock().insert(key, value);
    }

    /// Number of memoized answers.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of lookups answered from the memo.
    pub fn hits(&self) -> u64 {
        *self.hits.lock()
    }
}

/// Condition assumptions in force at one point of the walk.
#[derive(Debug, Clone)]
pub struct ConditionState {
    set: Arc<ConditionSet>,
    regions: Arc<[Region]>,
    status: BTreeMap<String, bool>,
    cache: Arc<SatCache>,
}

impl ConditionState {
    /// The initial state of a pass: nothing assumed, fresh cache.
    pub fn new(set: Arc<ConditionSet>, regions: Vec<Region>) -> Self {
        Self::with_cache(set, regions, Arc::new(SatCache::new()))
    }

    /// The initial state of a pass sharing an existing cache.
    pub fn with_cache(set: Arc<ConditionSet>, regions: Vec<Region>, cache: Arc<SatCache>) -> Self {
        Self {
            set,
            regions: regions.into(),
            status: BTreeMap::new(),
            cache,
        }
    }

    /// The condition set being reasoned over.
    pub fn set(&self) -> &ConditionSet {
        &self.set
    }

    /// Regions of the current pass.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The pass-scoped consistency memo.
    pub fn cache(&self) -> &Arc<SatCache> {
        &self.cache
    }

    /// Status of one condition.
    pub fn status(&self, name: &str) -> ConditionStatus {
        self.status
            .get(name)
            .map_or(ConditionStatus::Unknown, |v| ConditionStatus::from_bool(*v))
    }

    /// Every assumption in force.
    pub fn assignments(&self) -> &BTreeMap<String, bool> {
        &self.status
    }

    /// Assume additional condition values, returning the new state.
    ///
    /// # Errors
    ///
    /// - `UnknownSatisfaction` if a named condition is undefined or invalid.
    /// - `Unsatisfiable` if a value flips a known status or the combined
    ///   assumptions contradict each other.
    pub fn evolve(&self, changes: &BTreeMap<String, bool>) -> Result<Self, ConditionError> {
        let mut merged = self.status.clone();
        for (name, value) in changes {
            self.set.condition(name)?;
            let status = self.status(name).transition(*value).map_err(|conflict| {
                ConditionError::Unsatisfiable {
                    new: changes.clone(),
                    current: self.status.clone(),
                    description: format!(
                        "condition {name:?} is already {:?} and cannot become {}",
                        conflict.current, conflict.requested
                    ),
                }
            })?;
            if let Some(v) = status.as_bool() {
                merged.insert(name.clone(), v);
            }
        }
        if merged == self.status {
            return Ok(self.clone());
        }
        if !self.consistent(&merged)? {
            let description = changes
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            tracing::trace!(%description, "assumption rejected");
            return Err(ConditionError::Unsatisfiable {
                new: changes.clone(),
                current: self.status.clone(),
                description: format!("{description} contradicts the current assumptions"),
            });
        }
        Ok(Self {
            set: Arc::clone(&self.set),
            regions: Arc::clone(&self.regions),
            status: merged,
            cache: Arc::clone(&self.cache),
        })
    }

    /// Whether `name` can take `desired` under the current assumptions.
    pub fn is_satisfiable(&self, name: &str, desired: bool) -> Result<bool, ConditionError> {
        self.set.condition(name)?;
        if let Some(v) = self.status.get(name) {
            return Ok(*v == desired);
        }
        let mut all = self.status.clone();
        all.insert(name.to_string(), desired);
        self.consistent(&all)
    }

    /// Whether `name` necessarily holds under the current assumptions.
    pub fn implies(&self, name: &str) -> Result<bool, ConditionError> {
        Ok(!self.is_satisfiable(name, false)?)
    }

    /// Reachable scenarios of `names` consistent with the current assumptions.
    pub fn build_scenarios<I, S>(
        &self,
        names: I,
        max_leaves: usize,
    ) -> Result<ScenarioSpace<'_>, ConditionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set
            .scenarios_given(names, &self.status, &self.regions, max_leaves)
    }

    fn consistent(&self, assignment: &BTreeMap<String, bool>) -> Result<bool, ConditionError> {
        let key = self.set.query_key(assignment, &self.regions)?;
        if let Some(answer) = self.cache.get(&key) {
            return Ok(answer);
        }
        let answer = self.set.is_consistent(assignment, &self.regions)?;
        self.cache.insert(key, answer);
        Ok(answer)
    }
}
