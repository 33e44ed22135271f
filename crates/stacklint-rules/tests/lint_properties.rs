//! # Lint Pass Properties
//!
//! - Determinism: parallel and sequential region passes agree.
//! - Locality: a bad scalar only produces findings at its own path, under
//!   the rules that constrain it.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use stacklint_core::Region;
use stacklint_engine::{LintConfig, Linter};
use stacklint_rules::standard_registry;
use stacklint_schema::InMemorySchemaStore;

fn linter(parallel_regions: bool) -> Linter {
    let registry = Arc::new(standard_registry().expect("standard registry builds"));
    let store = Arc::new(InMemorySchemaStore::bundled().expect("bundled schemas load"));
    let config = LintConfig {
        parallel_regions,
        ..LintConfig::default()
    };
    Linter::new(registry, store, config).expect("valid config")
}

fn regions() -> Vec<Region> {
    ["us-east-1", "eu-west-1", "us-gov-west-1"]
        .into_iter()
        .map(|r| Region::new(r).expect("valid region"))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn bucket_name_findings_stay_local(name in "[A-Za-z0-9._-]{0,70}") {
        let template = json!({"Resources": {"Bucket": {
            "Type": "AWS::S3::Bucket",
            "Properties": {"BucketName": name, "AccessControl": "Private"}
        }}});
        let diagnostics = linter(false).lint_value(template, &[]).expect("template parses");
        for d in &diagnostics {
            prop_assert_eq!(d.display_path(), "Resources/Bucket/Properties/BucketName");
            prop_assert!(["E3031", "E3033", "E3036"].contains(&d.rule_id.as_str()), "{}", d);
        }
    }

    #[test]
    fn parallel_regions_match_sequential(delay in -10i64..2000, fifo in any::<bool>()) {
        let template = json!({"Resources": {"Queue": {
            "Type": "AWS::SQS::Queue",
            "Properties": {"DelaySeconds": delay, "ContentBasedDeduplication": fifo}
        }}});
        let sequential = linter(false).lint_value(template.clone(), &regions()).expect("template parses");
        let parallel = linter(true).lint_value(template, &regions()).expect("template parses");
        prop_assert_eq!(sequential, parallel);
    }
}
