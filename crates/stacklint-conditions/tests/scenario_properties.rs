//! # Condition Engine Property Tests
//!
//! - N conditions over independent parameters enumerate exactly 2^N
//!   scenarios, each distinct.
//! - Conditions comparing one parameter against distinct literals never
//!   appear true together.
//! - `evolve` is monotonic: once a status is known it never flips, and the
//!   receiver is unchanged.
//! - Two identically defined conditions are equivalent and always agree.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use stacklint_conditions::{ConditionError, ConditionSet, ConditionState, ConditionStatus};
use stacklint_core::{Region, Template};

fn build(conditions: Map<String, Value>, parameters: Value) -> ConditionSet {
    let template = Template::from_value(json!({
        "Parameters": parameters,
        "Conditions": Value::Object(conditions),
    }))
    .expect("template parses");
    let (set, issues) = ConditionSet::from_template(&template);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    set
}

fn independent(n: usize) -> ConditionSet {
    let mut conditions = Map::new();
    for i in 0..n {
        conditions.insert(
            format!("C{i}"),
            json!({"Fn::Equals": [{"Ref": format!("P{i}")}, "on"]}),
        );
    }
    build(conditions, json!({}))
}

proptest! {
    #[test]
    fn independent_conditions_cover_power_set(n in 1usize..=6) {
        let set = independent(n);
        let names: Vec<String> = (0..n).map(|i| format!("C{i}")).collect();
        let space = set.build_scenarios(&names, &[], 16).expect("within limit");
        let scenarios: Vec<_> = space.iter().collect();
        let distinct: BTreeSet<Vec<bool>> = scenarios
            .iter()
            .map(|s| names.iter().map(|n| s[n]).collect())
            .collect();
        prop_assert_eq!(scenarios.len(), 1usize << n);
        prop_assert_eq!(distinct.len(), 1usize << n);
    }

    #[test]
    fn shared_subject_is_at_most_one(literals in prop::collection::btree_set("[a-z]{1,6}", 2..5)) {
        let mut conditions = Map::new();
        let names: Vec<String> = literals.iter().map(|l| format!("Is{l}")).collect();
        for (name, literal) in names.iter().zip(&literals) {
            conditions.insert(name.clone(), json!({"Fn::Equals": [{"Ref": "Env"}, literal]}));
        }
        let set = build(conditions, json!({}));
        let space = set.build_scenarios(&names, &[], 16).expect("within limit");
        let mut count = 0;
        for scenario in space.iter() {
            count += 1;
            prop_assert!(scenario.values().filter(|v| **v).count() <= 1);
        }
        // Every single one true, plus all false.
        prop_assert_eq!(count, names.len() + 1);
    }

    #[test]
    fn evolve_is_monotonic(first in any::<bool>(), second in any::<bool>()) {
        let set = Arc::new(independent(2));
        let state = ConditionState::new(set, vec![Region::new("us-east-1").expect("region")]);
        let once = state
            .evolve(&BTreeMap::from([("C0".to_string(), first)]))
            .expect("independent assumption holds");
        prop_assert_eq!(state.status("C0"), ConditionStatus::Unknown);
        prop_assert_eq!(once.status("C0"), ConditionStatus::from_bool(first));

        let again = once.evolve(&BTreeMap::from([("C0".to_string(), second)]));
        if first == second {
            let again = again.expect("restating a status is allowed");
            prop_assert_eq!(again.status("C0"), ConditionStatus::from_bool(first));
        } else {
            let is_unsat = matches!(again, Err(ConditionError::Unsatisfiable { .. }));
            prop_assert!(is_unsat);
            prop_assert_eq!(once.status("C0"), ConditionStatus::from_bool(first));
        }
    }
}

#[test]
fn identical_definitions_always_agree() {
    let mut conditions = Map::new();
    conditions.insert(
        "UseBucket".to_string(),
        json!({"Fn::And": [
            {"Fn::Equals": [{"Ref": "Env"}, "prod"]},
            {"Fn::Not": [{"Fn::Equals": [{"Ref": "AWS::Region"}, "us-west-2"]}]}
        ]}),
    );
    conditions.insert(
        "BucketEnabled".to_string(),
        json!({"Fn::And": [
            {"Fn::Not": [{"Fn::Equals": ["us-west-2", {"Ref": "AWS::Region"}]}]},
            {"Fn::Equals": ["prod", {"Ref": "Env"}]}
        ]}),
    );
    let set = build(conditions, json!({}));
    assert!(set.equivalent("UseBucket", "BucketEnabled").unwrap());

    let regions = [
        Region::new("us-east-1").unwrap(),
        Region::new("us-west-2").unwrap(),
    ];
    let space = set
        .build_scenarios(["UseBucket", "BucketEnabled"], &regions, 16)
        .unwrap();
    for scenario in space.iter() {
        assert_eq!(scenario["UseBucket"], scenario["BucketEnabled"]);
    }
    let assumed = BTreeMap::from([("UseBucket".to_string(), true)]);
    assert!(set
        .check_implies(&assumed, "BucketEnabled", &regions)
        .unwrap());
}

#[test]
fn unsatisfiable_scenario_implies_anything() {
    let mut conditions = Map::new();
    conditions.insert("A".to_string(), json!({"Fn::Equals": [{"Ref": "Env"}, "a"]}));
    conditions.insert("B".to_string(), json!({"Fn::Equals": [{"Ref": "Env"}, "b"]}));
    conditions.insert("C".to_string(), json!({"Fn::Equals": [{"Ref": "Other"}, "c"]}));
    let set = build(conditions, json!({}));
    let impossible = BTreeMap::from([("A".to_string(), true), ("B".to_string(), true)]);
    assert!(set.check_implies(&impossible, "C", &[]).unwrap());
}
