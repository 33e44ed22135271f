//! Pseudo-parameters and their per-region values.

use serde_json::{json, Value};

use stacklint_core::Region;

/// Account id substituted for `AWS::AccountId`.
pub const ACCOUNT_ID: &str = "123456789012";

/// Stack name substituted for `AWS::StackName`.
pub const STACK_NAME: &str = "teststack";

/// Every pseudo-parameter name, sorted.
pub const PSEUDO_PARAMETERS: [&str; 8] = [
    "AWS::AccountId",
    "AWS::NoValue",
    "AWS::NotificationARNs",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

/// Whether `name` is a pseudo-parameter.
pub fn is_pseudo(name: &str) -> bool {
    PSEUDO_PARAMETERS.binary_search(&name).is_ok()
}

/// The value `name` takes in `region`. `None` for `AWS::NoValue` and for
/// names that are not pseudo-parameters.
pub fn pseudo_value(name: &str, region: &Region) -> Option<Value> {
    let partition = region.partition();
    let value = match name {
        "AWS::AccountId" => json!(ACCOUNT_ID),
        "AWS::Region" => json!(region.as_str()),
        "AWS::Partition" => json!(partition.as_str()),
        "AWS::URLSuffix" => json!(region.url_suffix()),
        "AWS::StackName" => json!(STACK_NAME),
        "AWS::StackId" => json!(format!(
            "arn:{partition}:cloudformation:{region}:{ACCOUNT_ID}:stack/{STACK_NAME}/51af3dc0-da77-11e4-872e-1234567db123"
        )),
        "AWS::NotificationARNs" => json!([format!(
            "arn:{partition}:sns:{region}:{ACCOUNT_ID}:notification"
        )]),
        _ => return None,
    };
    Some(value)
}
