//! # Standard Rules on Bundled Schemas
//!
//! Full lint passes over small templates with the standard registry and the
//! bundled resource schemas.

use std::sync::Arc;

use serde_json::{json, Value};

use stacklint_core::Region;
use stacklint_engine::{Diagnostic, LintConfig, Linter, Severity};
use stacklint_rules::standard_registry;
use stacklint_schema::InMemorySchemaStore;

fn linter(config: LintConfig) -> Linter {
    let registry = Arc::new(standard_registry().expect("standard registry builds"));
    let store = Arc::new(InMemorySchemaStore::bundled().expect("bundled schemas load"));
    Linter::new(registry, store, config).expect("valid config")
}

fn lint(template: Value, regions: &[&str]) -> Vec<Diagnostic> {
    lint_with(LintConfig::default(), template, regions)
}

fn lint_with(config: LintConfig, template: Value, regions: &[&str]) -> Vec<Diagnostic> {
    let regions: Vec<Region> = regions.iter().map(|r| Region::new(*r).expect("valid region")).collect();
    linter(config).lint_value(template, &regions).expect("template parses")
}

/// `(rule, path)` pairs, sorted.
fn findings(diagnostics: &[Diagnostic]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = diagnostics
        .iter()
        .map(|d| (d.rule_id.clone(), d.display_path()))
        .collect();
    out.sort();
    out
}

fn pair(rule: &str, path: &str) -> (String, String) {
    (rule.to_string(), path.to_string())
}

#[test]
fn clean_template_has_no_findings() {
    let diagnostics = lint(
        json!({
            "Parameters": {"Env": {"Type": "String", "AllowedValues": ["dev", "prod"]}},
            "Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}},
            "Resources": {
                "Bucket": {
                    "Type": "AWS::S3::Bucket",
                    "Properties": {
                        "BucketName": {"Fn::Sub": "logs-${AWS::Region}-${Env}"},
                        "VersioningConfiguration": {
                            "Status": {"Fn::If": ["IsProd", "Enabled", "Suspended"]}
                        },
                        "Tags": [{"Key": "env", "Value": {"Ref": "Env"}}]
                    }
                },
                "Queue": {
                    "Type": "AWS::SQS::Queue",
                    "Properties": {
                        "DelaySeconds": "30",
                        "QueueName": {"Fn::GetAtt": ["Bucket", "Arn"]}
                    }
                }
            }
        }),
        &[],
    );
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

#[test]
fn bucket_property_errors() {
    let diagnostics = lint(
        json!({"Resources": {"Bucket": {
            "Type": "AWS::S3::Bucket",
            "Properties": {"BucketName": "AB", "AccessControl": "Open", "Nmae": "x", "Arn": "arn"}
        }}}),
        &[],
    );
    assert_eq!(
        findings(&diagnostics),
        vec![
            pair("E3002", "Resources/Bucket/Properties/Nmae"),
            pair("E3009", "Resources/Bucket/Properties/Arn"),
            pair("E3030", "Resources/Bucket/Properties/AccessControl"),
            pair("E3031", "Resources/Bucket/Properties/BucketName"),
            pair("E3033", "Resources/Bucket/Properties/BucketName"),
        ]
    );
    assert!(diagnostics.iter().all(|d| d.severity == Severity::Error));
    let access = diagnostics.iter().find(|d| d.rule_id == "E3030").expect("enum finding");
    assert_eq!(access.schema_path, vec!["AccessControl".to_string()]);
    assert_eq!(access.regions, vec![Region::new("us-east-1").expect("valid region")]);
}

#[test]
fn unreachable_branches_are_not_checked() {
    let diagnostics = lint(
        json!({
            "Parameters": {"Env": {"Type": "String"}},
            "Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}},
            "Resources": {
                "Queue": {
                    "Type": "AWS::SQS::Queue",
                    "Properties": {"DelaySeconds": {"Fn::If": ["IsProd", 1000, 10]}}
                },
                "ProdQueue": {
                    "Type": "AWS::SQS::Queue",
                    "Condition": "IsProd",
                    "Properties": {"DelaySeconds": {"Fn::If": ["IsProd", 10, 1000]}}
                }
            }
        }),
        &[],
    );
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].rule_id, "E3038");
    assert_eq!(diagnostics[0].display_path(), "Resources/Queue/Properties/DelaySeconds/Fn::If/1");
    assert_eq!(diagnostics[0].message, "1000 is greater than the maximum of 900");
}

#[test]
fn subnet_zones_and_required_properties() {
    let diagnostics = lint(
        json!({"Resources": {
            "Vpc": {"Type": "AWS::EC2::VPC", "Properties": {"CidrBlock": "10.0.0.0/16"}},
            "Hardcoded": {"Type": "AWS::EC2::Subnet", "Properties": {
                "VpcId": {"Ref": "Vpc"},
                "CidrBlock": "10.0.0.0/24",
                "AvailabilityZone": "us-east-1a"
            }},
            "Dynamic": {"Type": "AWS::EC2::Subnet", "Properties": {
                "VpcId": {"Ref": "Vpc"},
                "CidrBlock": "10.0.1.0/24",
                "AvailabilityZone": {"Fn::Select": [0, {"Fn::GetAZs": ""}]}
            }},
            "Orphan": {"Type": "AWS::EC2::Subnet", "Properties": {"CidrBlock": "10.0.2.0/24"}}
        }}),
        &[],
    );
    assert_eq!(
        findings(&diagnostics),
        vec![
            pair("E3003", "Resources/Orphan/Properties"),
            pair("W3010", "Resources/Hardcoded/Properties/AvailabilityZone"),
        ]
    );

    let quiet = lint_with(
        LintConfig {
            ignore_checks: vec!["W".into()],
            ..LintConfig::default()
        },
        json!({"Resources": {"S": {"Type": "AWS::EC2::Subnet", "Properties": {
            "VpcId": "vpc-1", "AvailabilityZone": "us-east-1a"
        }}}}),
        &[],
    );
    assert!(quiet.is_empty());
}

#[test]
fn regional_schemas_differ() {
    let diagnostics = lint(
        json!({"Resources": {"Queue": {
            "Type": "AWS::SQS::Queue",
            "Properties": {"ContentBasedDeduplication": true}
        }}}),
        &["us-east-1", "us-gov-west-1"],
    );
    assert_eq!(
        findings(&diagnostics),
        vec![
            pair("E3002", "Resources/Queue/Properties/ContentBasedDeduplication"),
            pair("E3021", "Resources/Queue/Properties"),
        ]
    );
    let regions = |rule: &str| -> Vec<String> {
        diagnostics
            .iter()
            .find(|d| d.rule_id == rule)
            .map(|d| d.regions.iter().map(|r| r.to_string()).collect())
            .unwrap_or_default()
    };
    assert_eq!(regions("E3002"), vec!["us-gov-west-1"]);
    assert_eq!(regions("E3021"), vec!["us-east-1"]);
}

#[test]
fn identical_findings_merge_across_regions() {
    let diagnostics = lint(
        json!({"Resources": {"Bucket": {
            "Type": "AWS::S3::Bucket",
            "Properties": {"AccessControl": "Open"}
        }}}),
        &["us-east-1", "eu-west-1"],
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].regions.len(), 2);
}

#[test]
fn function_aware_checks() {
    let diagnostics = lint(
        json!({
            "Parameters": {"Env": {"Type": "String", "AllowedValues": ["dev", "prod"]}},
            "Conditions": {"IsProd": {"Fn::Equals": [{"Ref": "Env"}, "prod"]}},
            "Mappings": {"Sizes": {"dev": {"Delay": 5}, "prod": {"Delay": 10}}},
            "Resources": {
                "Bucket": {"Type": "AWS::S3::Bucket"},
                "ProdQueue": {"Type": "AWS::SQS::Queue", "Condition": "IsProd"},
                "Queue": {"Type": "AWS::SQS::Queue", "Properties": {
                    "QueueName": {"Fn::GetAtt": ["Bucket", "Nope"]},
                    "DelaySeconds": {"Fn::FindInMap": ["Sizes", "test", "Delay"]}
                }},
                "Other": {"Type": "AWS::SQS::Queue", "Properties": {
                    "QueueName": {"Ref": "ProdQueue"}
                }},
                "Named": {"Type": "AWS::SQS::Queue", "Properties": {
                    "QueueName": {"Fn::Sub": "fixed"}
                }}
            }
        }),
        &[],
    );
    assert_eq!(
        findings(&diagnostics),
        vec![
            pair("E1010", "Resources/Queue/Properties/QueueName/Fn::GetAtt/1"),
            pair("E1011", "Resources/Queue/Properties/DelaySeconds/Fn::FindInMap/1"),
            pair("W1001", "Resources/Other/Properties/QueueName/Ref"),
            pair("W1020", "Resources/Named/Properties/QueueName/Fn::Sub"),
        ]
    );
}

#[test]
fn strict_types_reject_numeric_strings() {
    let template = json!({"Resources": {"Queue": {
        "Type": "AWS::SQS::Queue",
        "Properties": {"DelaySeconds": "30"}
    }}});
    assert!(lint(template.clone(), &[]).is_empty());
    let strict = lint_with(
        LintConfig {
            strict_types: true,
            ..LintConfig::default()
        },
        template,
        &[],
    );
    assert_eq!(findings(&strict), vec![pair("E3012", "Resources/Queue/Properties/DelaySeconds")]);
}
